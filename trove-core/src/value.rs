use std::fmt::{self, Display};

/// A single cell read from the store or bound as a query parameter.
///
/// Nullability is a property of the cell: `Null` is a present column holding no value,
/// which is different from a column that is missing from the row altogether.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Box<[u8]>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Storage class name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(..) => "INTEGER",
            Value::Real(..) => "REAL",
            Value::Boolean(..) => "BOOLEAN",
            Value::Text(..) => "TEXT",
            Value::Blob(..) => "BLOB",
        }
    }

    /// Literal written to the store for this value, `None` for NULL.
    ///
    /// A missing value never turns into the text `null`.
    pub fn to_storage_literal(&self) -> Option<String> {
        Some(match self {
            Value::Null => return None,
            Value::Integer(v) => {
                let mut buffer = itoa::Buffer::new();
                buffer.format(*v).to_owned()
            }
            Value::Real(v) => {
                if v.is_finite() {
                    let mut buffer = ryu::Buffer::new();
                    buffer.format_finite(*v).to_owned()
                } else {
                    v.to_string()
                }
            }
            Value::Boolean(v) => if *v { "1" } else { "0" }.to_owned(),
            Value::Text(v) => v.clone(),
            Value::Blob(v) => hex::encode(v),
        })
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Blob(v) => write!(f, "X'{}'", hex::encode_upper(v)),
            _ => f.write_str(&self.to_storage_literal().unwrap_or_default()),
        }
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Self {
        Value::Text(value.to_owned())
    }
}

use crate::{OrmError, Result, RowLabeled, Value, decode_type};
use atoi::FromRadix10SignedChecked;
use std::fmt::{self, Display};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    Blob,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Blob => "BLOB",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Semantic type of a persisted field.
///
/// Closed set: every kind has a nullable twin (`*Opt`) that maps a NULL cell to
/// [`Value::Null`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    TextOpt,
    Char,
    CharOpt,
    Short,
    ShortOpt,
    Int,
    IntOpt,
    Long,
    LongOpt,
    Float,
    FloatOpt,
    Double,
    DoubleOpt,
    Bool,
    BoolOpt,
    Blob,
    BlobOpt,
}

impl ValueKind {
    /// Nullable twin of this kind (itself when already nullable).
    pub const fn nullable(self) -> Self {
        use ValueKind::*;
        match self {
            Text | TextOpt => TextOpt,
            Char | CharOpt => CharOpt,
            Short | ShortOpt => ShortOpt,
            Int | IntOpt => IntOpt,
            Long | LongOpt => LongOpt,
            Float | FloatOpt => FloatOpt,
            Double | DoubleOpt => DoubleOpt,
            Bool | BoolOpt => BoolOpt,
            Blob | BlobOpt => BlobOpt,
        }
    }

    /// Non nullable twin of this kind (itself when already non nullable).
    pub const fn base(self) -> Self {
        use ValueKind::*;
        match self {
            Text | TextOpt => Text,
            Char | CharOpt => Char,
            Short | ShortOpt => Short,
            Int | IntOpt => Int,
            Long | LongOpt => Long,
            Float | FloatOpt => Float,
            Double | DoubleOpt => Double,
            Bool | BoolOpt => Bool,
            Blob | BlobOpt => Blob,
        }
    }

    pub const fn is_nullable(self) -> bool {
        use ValueKind::*;
        matches!(
            self,
            TextOpt
                | CharOpt
                | ShortOpt
                | IntOpt
                | LongOpt
                | FloatOpt
                | DoubleOpt
                | BoolOpt
                | BlobOpt
        )
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self.base(),
            ValueKind::Short | ValueKind::Int | ValueKind::Long
        )
    }

    pub const fn column_type(self) -> ColumnType {
        use ValueKind::*;
        match self.base() {
            Text | Char => ColumnType::Text,
            Short | Int | Long => ColumnType::Integer,
            Float | Double => ColumnType::Real,
            Bool => ColumnType::Boolean,
            Blob => ColumnType::Blob,
            _ => unreachable!(),
        }
    }

    /// Kind of a Rust type written as source text, like `i32` or `Option<String>`.
    pub fn from_type_name(name: &str) -> Result<Self> {
        let ty = syn::parse_str::<syn::Type>(name)
            .map_err(|_| OrmError::UnsupportedType(name.to_owned()))?;
        Ok(decode_type(&ty).map_err(|_| OrmError::UnsupportedType(name.to_owned()))?)
    }

    /// Read the cell of `column` from `row` as this kind.
    pub fn extract(self, row: &RowLabeled, column: &str) -> Result<Value> {
        let Some(cell) = row.get_column(column) else {
            return Err(OrmError::ColumnNotFound {
                column: column.to_owned(),
            }
            .into());
        };
        self.coerce(column, cell)
    }

    /// Read the cell at position `index` from `row` as this kind.
    pub fn extract_index(self, row: &RowLabeled, index: usize) -> Result<Value> {
        let Some(cell) = row.values().get(index) else {
            return Err(OrmError::ColumnNotFound {
                column: format!("#{}", index),
            }
            .into());
        };
        let column = row
            .names()
            .get(index)
            .map(String::as_str)
            .unwrap_or_default();
        self.coerce(column, cell)
    }

    /// Convert a cell into the canonical value of this kind.
    ///
    /// The null check always happens before any conversion.
    pub fn coerce(self, column: &str, cell: &Value) -> Result<Value> {
        if cell.is_null() {
            if self.is_nullable() {
                return Ok(Value::Null);
            }
            return Err(OrmError::NullConstraintViolation {
                column: column.to_owned(),
            }
            .into());
        }
        let mismatch = || -> crate::Error {
            OrmError::TypeMismatch {
                column: column.to_owned(),
                expected: self,
                found: format!("{} {}", cell.type_name(), cell),
            }
            .into()
        };
        use ValueKind::*;
        Ok(match self.base() {
            Text => match cell {
                Value::Blob(v) => {
                    Value::Text(String::from_utf8(v.to_vec()).map_err(|_| mismatch())?)
                }
                _ => Value::Text(cell.to_storage_literal().unwrap_or_default()),
            },
            Char => match cell {
                Value::Text(v) if v.chars().count() == 1 => Value::Text(v.clone()),
                Value::Integer(v) if (0..=9).contains(v) => Value::Text(v.to_string()),
                _ => return Err(mismatch()),
            },
            Short => Value::Integer(
                coerce_integer(cell, i16::MIN as _, i16::MAX as _).ok_or_else(mismatch)?,
            ),
            Int => Value::Integer(
                coerce_integer(cell, i32::MIN as _, i32::MAX as _).ok_or_else(mismatch)?,
            ),
            Long => {
                Value::Integer(coerce_integer(cell, i64::MIN, i64::MAX).ok_or_else(mismatch)?)
            }
            Float | Double => Value::Real(match cell {
                Value::Real(v) => *v,
                Value::Integer(v) => *v as f64,
                Value::Boolean(v) => *v as i64 as f64,
                Value::Text(v) => fast_float::parse::<f64, _>(v.trim()).map_err(|_| mismatch())?,
                _ => return Err(mismatch()),
            }),
            Bool => Value::Boolean(match cell {
                Value::Boolean(v) => *v,
                Value::Integer(v) => *v == 1,
                Value::Text(v) => match v.trim() {
                    t if t.eq_ignore_ascii_case("true") || t == "1" => true,
                    t if t.eq_ignore_ascii_case("false") || t == "0" => false,
                    _ => return Err(mismatch()),
                },
                _ => return Err(mismatch()),
            }),
            Blob => match cell {
                Value::Blob(v) => Value::Blob(v.clone()),
                Value::Text(v) => Value::Blob(v.as_bytes().into()),
                _ => return Err(mismatch()),
            },
            _ => unreachable!(),
        })
    }
}

/// Integer content of a cell, truncating reals the way a cursor does.
fn coerce_integer(cell: &Value, min: i64, max: i64) -> Option<i64> {
    let value = match cell {
        Value::Integer(v) => *v,
        Value::Real(v) if v.is_finite() => v.trunc() as i64,
        Value::Boolean(v) => *v as i64,
        Value::Text(v) => {
            let text = v.trim().as_bytes();
            match i64::from_radix_10_signed_checked(text) {
                (Some(v), len) if len == text.len() && len > 0 => v,
                _ => return None,
            }
        }
        _ => return None,
    };
    (min..=max).contains(&value).then_some(value)
}

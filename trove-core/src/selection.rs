use crate::Value;

/// WHERE clause of a query together with the values bound to its `?` placeholders.
///
/// Empty criteria select every row.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Selection {
    pub criteria: String,
    pub params: Vec<Value>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(criteria: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// First argument is the WHERE clause, the others are bound as text.
    ///
    /// ```rust
    /// use trove_core::{Selection, Value};
    /// let selection = Selection::from_args(["age > ? AND name <> ?", "3", "B"]);
    /// assert_eq!(selection.criteria, "age > ? AND name <> ?");
    /// assert_eq!(selection.params, [Value::Text("3".into()), Value::Text("B".into())]);
    /// ```
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter();
        Self {
            criteria: args.next().map(Into::into).unwrap_or_default(),
            params: args.map(|v| Value::Text(v.into())).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.criteria.trim().is_empty()
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Selection::new(value)
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::new(value)
    }
}

impl From<()> for Selection {
    fn from(_: ()) -> Self {
        Selection::all()
    }
}

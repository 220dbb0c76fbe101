use crate::Value;
use std::sync::Arc;

pub type RowNames = Arc<[String]>;

/// A result row: cells together with the column labels of the result set.
///
/// Labels are shared by every row of the same cursor.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RowLabeled {
    names: RowNames,
    values: Box<[Value]>,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Box<[Value]>) -> Self {
        Self { names, values }
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// Position of the column labeled `name`, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|v| v == name)
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.column_index(name).and_then(|i| self.values.get(i))
    }
}

/// Ordered column name to value map, the flat form of a model instance.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, Value)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }
    /// Set `column`, replacing the value in place when it is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == column).then_some(v))
    }
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == column)?;
        Some(self.entries.remove(index).1)
    }
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut result = ColumnMap::new();
        for (k, v) in iter {
            result.insert(k, v);
        }
        result
    }
}

impl IntoIterator for ColumnMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<ColumnMap> for RowLabeled {
    fn from(value: ColumnMap) -> Self {
        let (names, values): (Vec<_>, Vec<_>) = value.entries.into_iter().unzip();
        RowLabeled::new(names.into(), values.into())
    }
}

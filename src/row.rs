use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};
use crate::value::Value;

/// A row is a mapping from column name to [Value].
///
/// Entries keep insertion order so projections and joins return columns in
/// the order the caller asked for. Column names are [Arc] shared so every
/// row loaded for a table points at the same name allocations.
///
/// Equality is map equality: two rows are equal when they hold the same
/// columns with equal values, regardless of column order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    entries: Vec<(Arc<str>, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Sets `column` to `value`. An existing column keeps its position and
    /// gets the new value.
    pub fn insert(&mut self, column: impl Into<Arc<str>>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Appends without looking for an existing column; the caller guarantees
    /// distinct names.
    pub(crate) fn push(&mut self, column: Arc<str>, value: Value) {
        self.entries.push((column, value));
    }

    /// Returns the value for `column`, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_ref() == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Returns the number of columns in the row.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column names in row order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_ref(), value))
    }

    /// Builds a new row with exactly `fields`, in the listed order.
    ///
    /// # Errors
    /// Returns [Error::InvalidField] if one of the fields is missing.
    pub fn project<S: AsRef<str>>(&self, fields: &[S]) -> Result<Row> {
        let mut projected = Row::with_capacity(fields.len());
        for field in fields {
            let field = field.as_ref();
            let (name, value) = self
                .entries
                .iter()
                .find(|(name, _)| name.as_ref() == field)
                .ok_or_else(|| Error::invalid_field(field))?;
            projected.entries.push((Arc::clone(name), value.clone()));
        }
        Ok(projected)
    }

    /// Field-wise union of `self` and `other`. When both define a column,
    /// `other`'s value wins and the column keeps `self`'s position.
    pub fn merge(&self, other: &Row) -> Row {
        let mut merged = Row::with_capacity(self.len() + other.len());
        merged.entries.extend(self.entries.iter().cloned());
        for (name, value) in &other.entries {
            merged.insert(Arc::clone(name), value.clone());
        }
        merged
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Eq for Row {}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<Arc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name.as_ref(), value)?;
        }
        map.end()
    }
}

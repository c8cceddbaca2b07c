use std::sync::Arc;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// A conjunction of equality predicates, column to required value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    predicates: Vec<(Arc<str>, Value)>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the requirement `column == value`.
    pub fn with(mut self, column: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<Arc<str>>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.predicates.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.predicates.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.predicates
            .iter()
            .find(|(name, _)| name.as_ref() == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|(name, _)| name.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.predicates
            .iter()
            .map(|(name, value)| (name.as_ref(), value))
    }

    /// True if every one of `columns` is constrained by this template.
    pub fn constrains_all<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        columns.iter().all(|c| self.get(c.as_ref()).is_some())
    }

    /// The template's values for `columns`, in `columns` order. `None` if one
    /// of them is not constrained.
    pub fn key_for<S: AsRef<str>>(&self, columns: &[S]) -> Option<Vec<Value>> {
        columns
            .iter()
            .map(|c| self.get(c.as_ref()).cloned())
            .collect()
    }

    /// Builds the equality template `columns == row[columns]`.
    ///
    /// # Errors
    /// Returns [Error::InvalidField] if the row lacks one of the columns.
    pub fn from_row<S: AsRef<str>>(row: &Row, columns: &[S]) -> Result<Self> {
        let mut template = Template::new();
        for column in columns {
            let column = column.as_ref();
            let value = row.get(column).ok_or_else(|| Error::invalid_field(column))?;
            template.insert(column, value.clone());
        }
        Ok(template)
    }

    /// True iff every constrained column of `row` equals the template value.
    ///
    /// # Errors
    /// Returns [Error::InvalidQuery] if the row lacks a constrained column,
    /// even when an earlier predicate already failed.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        let mut matched = true;
        for (column, required) in &self.predicates {
            let actual = row
                .get(column)
                .ok_or_else(|| Error::invalid_query(column.as_ref()))?;
            matched &= actual == required;
        }
        Ok(matched)
    }
}

impl<K, V> FromIterator<(K, V)> for Template
where
    K: Into<Arc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Template::new(), |template, (k, v)| template.with(k, v))
    }
}

/// Evaluates an optional template against a row. No template matches
/// every row.
pub fn matches_template(row: &Row, template: Option<&Template>) -> Result<bool> {
    match template {
        None => Ok(true),
        Some(template) => template.matches(row),
    }
}

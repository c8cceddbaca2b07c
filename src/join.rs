//! Equi-join between two tables on a shared column list.
//!
//! The nested loop is the reference evaluation. [JoinStrategy::IndexProbe]
//! and [JoinStrategy::Hash] return the same rows, possibly in another order.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::table::{Table, TableBuilder, project};
use crate::template::Template;
use crate::value::Value;

/// Name of the derived table holding the selected left rows.
pub const LEFT_SELECTED_TABLE: &str = "LEFTSELECTED";

/// Algorithm used to find matching right rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Compare every selected left row with every right row.
    #[default]
    NestedLoop,
    /// Probe an index of the right table per left row. Falls back to the
    /// nested loop when the right table has no usable index.
    IndexProbe,
    /// Hash the right rows on the join columns, then probe per left row.
    Hash,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::NestedLoop => write!(f, "NESTED LOOP"),
            JoinStrategy::IndexProbe => write!(f, "INDEX PROBE"),
            JoinStrategy::Hash => write!(f, "HASH"),
        }
    }
}

/// What to join on and what to return.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// Columns that must be equal on both sides.
    pub on_fields: Vec<String>,
    /// Selection applied to the left table before joining.
    pub where_template: Option<Template>,
    /// Columns kept in the result; `None` keeps every merged column.
    pub project_fields: Option<Vec<String>>,
    /// `None` means [JoinStrategy::NestedLoop], or the configured default
    /// when joining through a `Database`.
    pub strategy: Option<JoinStrategy>,
}

impl JoinOptions {
    /// Equi-join on `fields`.
    pub fn on<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            on_fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_where(mut self, template: Template) -> Self {
        self.where_template = Some(template);
        self
    }

    pub fn with_projection<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.project_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

impl Table {
    /// Joins `self` (left) with `right` on `options.on_fields`.
    ///
    /// Each output row is the union of a left and a right row. When both
    /// define a column outside the join columns, the right value wins.
    ///
    /// # Errors
    /// - [Error::InvalidField] if a selected left row lacks a join column.
    /// - [Error::InvalidQuery] if a right row lacks a join column, or the
    ///   where template names a column the left rows lack.
    /// - [Error::InvalidField] if a projected column is missing.
    pub fn join(&self, right: &Table, options: &JoinOptions) -> Result<Table> {
        let strategy = options.strategy.unwrap_or_default();
        let on_fields: Vec<&str> = options.on_fields.iter().map(String::as_str).collect();

        let selected = self.find_by_template(options.where_template.as_ref(), None, None, None)?;
        let left = Table::from_rows(LEFT_SELECTED_TABLE, selected);
        tracing::debug!(
            left = %self.name(),
            right = %right.name(),
            left_selected = left.len(),
            right_rows = right.len(),
            %strategy,
            "joining"
        );

        let mut output = TableBuilder::new(format!("JOIN:{}:{}", self.name(), right.name()));
        match strategy {
            JoinStrategy::NestedLoop => nested_loop(&left, right, &on_fields, &mut output)?,
            JoinStrategy::IndexProbe => index_probe(&left, right, &on_fields, &mut output)?,
            JoinStrategy::Hash => hash_join(&left, right, &on_fields, &mut output)?,
        }

        let table = output.finish();
        match &options.project_fields {
            None => Ok(table),
            Some(fields) => {
                let name = table.name().to_string();
                let rows = project(table.into_rows(), Some(fields.as_slice()))?;
                Ok(Table::from_rows(name, rows))
            }
        }
    }
}

fn nested_loop(
    left: &Table,
    right: &Table,
    on_fields: &[&str],
    output: &mut TableBuilder,
) -> Result<()> {
    for left_row in left.rows() {
        let on = Template::from_row(left_row, on_fields)?;
        for right_row in right.rows() {
            if on.matches(right_row)? {
                output.push(left_row.merge(right_row));
            }
        }
    }
    Ok(())
}

/// Raises the errors the nested loop raises before its first match: the
/// first left row lacking a join column, then any right row lacking one.
/// Returns the join template of the first left row, or `None` when the left
/// side is empty.
fn check_join_columns(
    left: &Table,
    right: &Table,
    on_fields: &[&str],
) -> Result<Option<Template>> {
    let Some(first) = left.rows().first() else {
        return Ok(None);
    };
    let on = Template::from_row(first, on_fields)?;
    for right_row in right.rows() {
        if let Some(missing) = on_fields.iter().find(|&&field| !right_row.contains(field)) {
            return Err(Error::invalid_query(*missing));
        }
    }
    Ok(Some(on))
}

fn index_probe(
    left: &Table,
    right: &Table,
    on_fields: &[&str],
    output: &mut TableBuilder,
) -> Result<()> {
    // Index usability depends on the constrained columns only.
    let Some(probe) = check_join_columns(left, right, on_fields)? else {
        return Ok(());
    };
    if !right.access_path(Some(&probe)).is_index() {
        tracing::debug!(right = %right.name(), "no usable index, using nested loop");
        return nested_loop(left, right, on_fields, output);
    }

    for left_row in left.rows() {
        let on = Template::from_row(left_row, on_fields)?;
        for right_row in right.find_by_template(Some(&on), None, None, None)? {
            output.push(left_row.merge(&right_row));
        }
    }
    Ok(())
}

fn hash_join(
    left: &Table,
    right: &Table,
    on_fields: &[&str],
    output: &mut TableBuilder,
) -> Result<()> {
    if check_join_columns(left, right, on_fields)?.is_none() {
        return Ok(());
    }
    let mut buckets: HashMap<Vec<Value>, Vec<&Row>> = HashMap::new();
    for right_row in right.rows() {
        let key = on_fields
            .iter()
            .map(|field| {
                right_row
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::invalid_query(*field))
            })
            .collect::<Result<Vec<Value>>>()?;
        buckets.entry(key).or_default().push(right_row);
    }

    for left_row in left.rows() {
        let key = Template::from_row(left_row, on_fields)?
            .key_for(on_fields)
            .unwrap_or_default();
        for right_row in buckets.get(&key).into_iter().flatten() {
            output.push(left_row.merge(right_row));
        }
    }
    Ok(())
}

//! Error types shared by every table operation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for table engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by loading, querying and joining tables.
///
/// Every variant aborts the operation that raised it: a failed load never
/// yields a half-built table and a failed projection never yields a partial
/// result.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing source could not be opened or read.
    #[error("could not read source {path:?}: {source}")]
    InvalidSource {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A projection or join key references a column absent from a row.
    #[error("invalid field {field:?}")]
    InvalidField { field: String },

    /// A template references a column the row does not have.
    #[error("invalid query: column {column:?} does not exist in row")]
    InvalidQuery { column: String },

    /// The operation exists on the interface but is not supported by the engine.
    #[error("{operation} is not supported")]
    UnsupportedOperation { operation: String },

    /// An index definition names columns that are not defined on the table.
    #[error("index {index:?} references undefined columns {columns:?}")]
    InvalidIndexColumns { index: String, columns: Vec<String> },

    /// The catalog has no description for the table.
    #[error("unknown table {table:?}")]
    UnknownTable { table: String },

    /// A table with the same name is already registered.
    #[error("table {table:?} already exists")]
    DuplicateTable { table: String },

    /// A column definition is duplicated or missing from the backing file.
    #[error("column definition {column:?} is invalid for table {table:?}")]
    InvalidColumnDefinition { table: String, column: String },

    /// Two indexes of one table share a name.
    #[error("index {index:?} is defined twice on table {table:?}")]
    DuplicateIndex { table: String, index: String },

    /// The named index does not exist on the table.
    #[error("unknown index {index:?} on table {table:?}")]
    UnknownIndex { table: String, index: String },

    /// The catalog file could not be read, parsed or written.
    #[error("catalog error: {reason}")]
    Catalog { reason: String },
}

impl Error {
    pub(crate) fn unsupported(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    pub(crate) fn invalid_field(field: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid_query(column: impl Into<String>) -> Self {
        Self::InvalidQuery {
            column: column.into(),
        }
    }

    pub(crate) fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }
}

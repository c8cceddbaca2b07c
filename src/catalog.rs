//! Schema catalog: where table descriptions come from.
//!
//! The engine only ever calls [Catalog::describe]. [MemoryCatalog] also
//! carries the administration operations used to build descriptions and
//! can persist them to a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, IndexDefinition, IndexKind, TableDescription};
use crate::source::RecordSource;

/// Name given to the index created by [MemoryCatalog::define_primary_key].
pub const PRIMARY_INDEX_NAME: &str = "PRIMARY";

/// Read side of the schema catalog.
pub trait Catalog {
    /// Returns the description of `table`.
    ///
    /// # Errors
    /// Returns [Error::UnknownTable] if the catalog has no such table.
    fn describe(&self, table: &str) -> Result<TableDescription>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn describe(&self, table: &str) -> Result<TableDescription> {
        (**self).describe(table)
    }
}

/// Catalog holding descriptions in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, TableDescription>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new table description.
    ///
    /// # Errors
    /// - [Error::DuplicateTable] if the name is taken.
    /// - Any error from [TableDescription::validate].
    pub fn create_table(&mut self, description: TableDescription) -> Result<()> {
        if self.tables.contains_key(&description.name) {
            return Err(Error::DuplicateTable {
                table: description.name,
            });
        }
        description.validate()?;
        tracing::debug!(table = %description.name, "registered table description");
        self.tables.insert(description.name.clone(), description);
        Ok(())
    }

    /// Removes a table description.
    pub fn drop_table(&mut self, table: &str) -> Result<TableDescription> {
        self.tables
            .remove(table)
            .ok_or_else(|| Error::unknown_table(table))
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut TableDescription> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| Error::unknown_table(table))
    }

    /// Adds a column definition after checking it against the backing
    /// file's header.
    ///
    /// # Errors
    /// Returns [Error::InvalidColumnDefinition] if the column is already
    /// defined or the source has no such column.
    pub fn add_column(
        &mut self,
        table: &str,
        column: ColumnDefinition,
        source: &dyn RecordSource,
    ) -> Result<()> {
        let description = self.table_mut(table)?;
        let headers = source.headers(&description.source_path)?;
        if description.column(&column.name).is_some() || !headers.contains(&column.name) {
            return Err(Error::InvalidColumnDefinition {
                table: table.to_string(),
                column: column.name,
            });
        }
        description.columns.push(column);
        Ok(())
    }

    /// Removes a column definition and every index that uses it.
    pub fn drop_column(&mut self, table: &str, column: &str) -> Result<()> {
        let description = self.table_mut(table)?;
        let before = description.columns.len();
        description.columns.retain(|c| c.name != column);
        if description.columns.len() == before {
            return Err(Error::InvalidColumnDefinition {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        description
            .indexes
            .retain(|index| !index.columns.iter().any(|c| c == column));
        Ok(())
    }

    /// Defines or replaces the primary key.
    pub fn define_primary_key<S: Into<String>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        self.define_index(table, PRIMARY_INDEX_NAME, columns, IndexKind::Primary)
    }

    /// Defines or replaces a named index. A replaced index keeps its
    /// declaration position.
    ///
    /// # Errors
    /// Returns [Error::InvalidIndexColumns] if a column is not defined.
    pub fn define_index<S: Into<String>>(
        &mut self,
        table: &str,
        name: &str,
        columns: impl IntoIterator<Item = S>,
        kind: IndexKind,
    ) -> Result<()> {
        let description = self.table_mut(table)?;
        let index = IndexDefinition::new(name, columns, kind);
        description.check_index(&index)?;
        match description.indexes.iter_mut().find(|i| i.name == name) {
            Some(existing) => *existing = index,
            None => description.indexes.push(index),
        }
        Ok(())
    }

    pub fn drop_index(&mut self, table: &str, name: &str) -> Result<()> {
        let description = self.table_mut(table)?;
        let before = description.indexes.len();
        description.indexes.retain(|i| i.name != name);
        if description.indexes.len() == before {
            return Err(Error::UnknownIndex {
                table: table.to_string(),
                index: name.to_string(),
            });
        }
        Ok(())
    }

    /// Loads every description stored in a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::Catalog {
            reason: format!("could not read {}: {e}", path.display()),
        })?;
        let descriptions: Vec<TableDescription> =
            serde_json::from_str(&text).map_err(|e| Error::Catalog {
                reason: format!("could not parse {}: {e}", path.display()),
            })?;

        let mut catalog = Self::new();
        for description in descriptions {
            catalog.create_table(description)?;
        }
        Ok(catalog)
    }

    /// Writes every description to a JSON catalog file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let descriptions: Vec<&TableDescription> = self.tables.values().collect();
        let text = serde_json::to_string_pretty(&descriptions).map_err(|e| Error::Catalog {
            reason: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| Error::Catalog {
            reason: format!("could not write {}: {e}", path.display()),
        })
    }
}

impl Catalog for MemoryCatalog {
    fn describe(&self, table: &str) -> Result<TableDescription> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| Error::unknown_table(table))
    }
}

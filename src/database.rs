use std::collections::HashMap;

use crate::catalog::{Catalog, MemoryCatalog};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::join::JoinOptions;
use crate::source::{CsvSource, RecordSource};
use crate::table::Table;

/// The main entry point of the engine.
/// It binds a catalog handle and a record source, and keeps the tables loaded
/// through them.
pub struct Database<C = MemoryCatalog, S = CsvSource> {
    catalog: C,
    source: S,
    config: EngineConfig,
    /// A map of table names to their loaded [Table].
    tables: HashMap<String, Table>,
}

impl<C: Catalog> Database<C, CsvSource> {
    /// Creates a database reading CSV files with the configured options.
    pub fn open(catalog: C, config: EngineConfig) -> Self {
        let source = CsvSource::new(config.csv.clone());
        Self {
            catalog,
            source,
            config,
            tables: HashMap::default(),
        }
    }
}

impl<C: Catalog, S: RecordSource> Database<C, S> {
    /// Creates a database over an explicit record source.
    pub fn new(catalog: C, source: S) -> Self {
        Self {
            catalog,
            source,
            config: EngineConfig::default(),
            tables: HashMap::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads a table through the catalog, or returns the copy already loaded.
    ///
    /// # Errors
    /// Returns any error raised by [Table::load]; nothing is registered on
    /// failure.
    pub fn load_table(&mut self, name: &str) -> Result<&Table> {
        if !self.tables.contains_key(name) {
            let table =
                Table::load_with(name, &self.catalog, &self.source, self.config.cost_model)?;
            self.tables.insert(name.to_string(), table);
        }
        self.tables
            .get(name)
            .ok_or_else(|| Error::unknown_table(name))
    }

    /// Retrieves a reference to a loaded table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Forgets a loaded table. The catalog is left untouched.
    ///
    /// # Errors
    /// Returns an error if the table is not loaded.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::unknown_table(name)),
        }
    }

    /// Returns a list of all loaded table names.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Joins two tables by name, loading them if needed. Without an explicit
    /// strategy the configured one is used.
    pub fn join(&mut self, left: &str, right: &str, options: &JoinOptions) -> Result<Table> {
        self.load_table(left)?;
        self.load_table(right)?;
        let left = self.get_table(left).ok_or_else(|| Error::unknown_table(left))?;
        let right = self.get_table(right).ok_or_else(|| Error::unknown_table(right))?;

        let mut options = options.clone();
        options.strategy = options.strategy.or(Some(self.config.join_strategy));
        left.join(right, &options)
    }
}

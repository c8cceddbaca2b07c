pub mod access_path;
pub mod catalog;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod index;
pub mod join;
pub mod row;
pub mod schema;
pub mod source;
pub mod table;
pub mod template;
pub mod value;

pub use access_path::{AccessPath, ColumnCount, CostModel, CostModelKind, DistinctKeys};
pub use catalog::{Catalog, MemoryCatalog};
pub use config::{CsvReadOptions, EngineConfig};
pub use data_type::DataType;
pub use database::Database;
pub use error::{Error, Result};
pub use index::{Index, IndexSet, IndexSignature, RowId};
pub use join::{JoinOptions, JoinStrategy};
pub use row::Row;
pub use schema::{ColumnDefinition, IndexDefinition, IndexKind, TableDescription};
pub use source::{CsvSource, MemorySource, RecordSource, SourceRecord};
pub use table::{Table, TableBuilder, TableKind, project};
pub use template::{Template, matches_template};
pub use value::Value;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::{Error, Result};

/// Column definition in a table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    /// Recorded for the catalog, never enforced by the engine.
    #[serde(default)]
    pub not_null: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType, not_null: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null,
        }
    }

    /// A nullable `text` column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Text, false)
    }

    /// A nullable `number` column.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Number, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexKind {
    Primary,
    Unique,
    #[default]
    Index,
}

impl IndexKind {
    /// PRIMARY and UNIQUE indexes expect one row per key.
    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Primary | Self::Unique)
    }
}

/// Named index over an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub kind: IndexKind,
}

impl IndexDefinition {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
        kind: IndexKind,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind,
        }
    }
}

/// Everything the engine needs to load a table: where the rows live, which
/// columns to keep and which indexes to build.
///
/// Indexes are kept in declaration order, which is also the tie-break order
/// when two indexes score the same for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub source_path: PathBuf,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl TableDescription {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Checks that `index` only references defined columns.
    ///
    /// # Errors
    /// Returns [Error::InvalidIndexColumns] listing the undefined columns.
    pub fn check_index(&self, index: &IndexDefinition) -> Result<()> {
        let undefined: Vec<String> = index
            .columns
            .iter()
            .filter(|c| self.column(c).is_none())
            .cloned()
            .collect();
        if index.columns.is_empty() || !undefined.is_empty() {
            return Err(Error::InvalidIndexColumns {
                index: index.name.clone(),
                columns: undefined,
            });
        }
        Ok(())
    }

    /// Validates column and index definitions as a whole.
    ///
    /// # Errors
    /// - [Error::InvalidColumnDefinition] if a column name is repeated.
    /// - [Error::InvalidIndexColumns] if an index names an undefined column.
    /// - [Error::DuplicateIndex] if two indexes share a name.
    pub fn validate(&self) -> Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::InvalidColumnDefinition {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        for (i, index) in self.indexes.iter().enumerate() {
            self.check_index(index)?;
            if self.indexes[..i].iter().any(|other| other.name == index.name) {
                return Err(Error::DuplicateIndex {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TableDescription {
        TableDescription::new("people", "people.csv")
            .with_column(ColumnDefinition::text("id"))
            .with_column(ColumnDefinition::text("name"))
            .with_column(ColumnDefinition::number("age"))
    }

    #[test]
    fn test_column_lookup() {
        let desc = people();
        assert_eq!(desc.column_names(), vec!["id", "name", "age"]);
        assert_eq!(desc.column("age").unwrap().data_type, DataType::Number);
        assert!(desc.column("email").is_none());
    }

    #[test]
    fn test_validate_accepts_defined_index_columns() {
        let desc = people().with_index(IndexDefinition::new("PRIMARY", ["id"], IndexKind::Primary));
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_undefined_index_columns() {
        let desc = people().with_index(IndexDefinition::new(
            "by_email",
            ["name", "email"],
            IndexKind::Index,
        ));
        let err = desc.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidIndexColumns { index, columns }
                if index == "by_email" && columns == vec!["email".to_string()]
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let desc = people().with_column(ColumnDefinition::text("id"));
        assert!(matches!(
            desc.validate(),
            Err(Error::InvalidColumnDefinition { .. })
        ));
    }

    #[test]
    fn test_description_json_shape() {
        let json = r#"{
            "name": "people",
            "source_path": "people.csv",
            "columns": [
                {"name": "id", "type": "text", "not_null": true},
                {"name": "age", "type": "number"}
            ],
            "indexes": [{"name": "PRIMARY", "columns": ["id"], "kind": "PRIMARY"}]
        }"#;
        let desc: TableDescription = serde_json::from_str(json).unwrap();
        assert!(desc.columns[0].not_null);
        assert!(!desc.columns[1].not_null);
        assert_eq!(desc.indexes[0].kind, IndexKind::Primary);
        assert!(desc.indexes[0].kind.is_unique());
    }
}

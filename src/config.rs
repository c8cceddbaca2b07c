//! Engine configuration.
//!
//! Every field has a default so a config file only needs to name what it
//! changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::access_path::CostModelKind;
use crate::error::{Error, Result};
use crate::join::JoinStrategy;

/// Options handed to the CSV reader when a table is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub quote: u8,
    /// The first record names the columns. Without headers, columns are
    /// named by their zero-based position.
    pub has_headers: bool,
    /// Trim surrounding whitespace from headers and fields.
    pub trim: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_headers: true,
            trim: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub csv: CsvReadOptions,
    pub join_strategy: JoinStrategy,
    pub cost_model: CostModelKind,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Catalog {
            reason: format!("invalid engine config: {e}"),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::Catalog {
            reason: format!("could not read config {}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.csv.delimiter, b',');
        assert!(config.csv.has_headers);
        assert_eq!(config.join_strategy, JoinStrategy::NestedLoop);
        assert_eq!(config.cost_model, CostModelKind::ColumnCount);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"join_strategy": "hash", "csv": {"delimiter": 59}}"#)
                .unwrap();
        assert_eq!(config.join_strategy, JoinStrategy::Hash);
        assert_eq!(config.csv.delimiter, b';');
        assert_eq!(config.csv.quote, b'"');
        assert_eq!(config.cost_model, CostModelKind::ColumnCount);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(Error::Catalog { .. })
        ));
    }
}

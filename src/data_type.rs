use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents the declared column types of a table description.
///
/// The type is recorded in the schema but not enforced at load time: cells
/// keep the text the source produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// A variable-length UTF-8 character string.
    #[default]
    Text,
    /// A numeric value.
    Number,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            other => Err(format!("unknown column type {other:?}")),
        }
    }
}

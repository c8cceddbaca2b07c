use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;

/// Represents a single cell stored in a table row.
///
/// Rows loaded from a source always hold [Value::Text]: the declared column
/// type is metadata only. [Value::Number] appears in rows built
/// programmatically, e.g. derived tables.
///
/// `Value` is `Eq + Hash` so it can be part of a structural index key. Numbers
/// compare by value with `-0.0 == 0.0` and every NaN equal to every other NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning between
    /// rows, index keys and derived tables.
    Text(Arc<str>),
    /// A 64-bit floating-point value.
    Number(f64),
}

impl Value {
    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner number if this is a [Value::Number].
    /// Otherwise, returns `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the logical [DataType] corresponding to this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::Text,
            Self::Number(_) => DataType::Number,
        }
    }

    fn number_bits(n: f64) -> u64 {
        if n == 0.0 {
            0.0f64.to_bits()
        } else if n.is_nan() {
            f64::NAN.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => Self::number_bits(*a) == Self::number_bits(*b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Text(s) => {
                state.write_u8(0);
                s.hash(state);
            }
            Self::Number(n) => {
                state.write_u8(1);
                Self::number_bits(*n).hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(Arc::from(s))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

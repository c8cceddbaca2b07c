//! Access path selection: index lookup or full scan.
//!
//! An index is usable for a template when the template constrains every
//! index column. The template may constrain more columns than the index
//! covers; those are re-checked on each candidate row.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::{Index, IndexSet};
use crate::template::Template;

/// Ranks a usable index for a template. Higher scores win; equal scores
/// keep the index declared first.
pub trait CostModel {
    fn score(&self, index: &Index, template: &Template) -> u64;
}

/// Prefers the index covering the most template columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnCount;

impl CostModel for ColumnCount {
    fn score(&self, index: &Index, _template: &Template) -> u64 {
        index.columns().len() as u64
    }
}

/// Column count first, then the number of distinct keys as a selectivity
/// estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctKeys;

impl CostModel for DistinctKeys {
    fn score(&self, index: &Index, _template: &Template) -> u64 {
        let columns = index.columns().len().min(u32::MAX as usize) as u64;
        let distinct = index.distinct_keys().min(u32::MAX as usize) as u64;
        (columns << 32) | distinct
    }
}

/// Configurable choice among the built-in cost models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModelKind {
    #[default]
    ColumnCount,
    DistinctKeys,
}

impl CostModel for CostModelKind {
    fn score(&self, index: &Index, template: &Template) -> u64 {
        match self {
            Self::ColumnCount => ColumnCount.score(index, template),
            Self::DistinctKeys => DistinctKeys.score(index, template),
        }
    }
}

/// Picks the best usable index for `template`, or `None` for a full scan.
pub fn choose_index<'a>(
    indexes: &'a IndexSet,
    template: &Template,
    cost: &dyn CostModel,
) -> Option<&'a Index> {
    let mut best: Option<(&Index, u64)> = None;
    for index in indexes.iter() {
        if !template.constrains_all(index.columns()) {
            continue;
        }
        let score = cost.score(index, template);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// The strategy chosen to evaluate a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    Index { name: String, columns: Vec<String> },
    FullScan,
}

impl AccessPath {
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index { .. })
    }
}

impl From<Option<&Index>> for AccessPath {
    fn from(index: Option<&Index>) -> Self {
        match index {
            Some(index) => Self::Index {
                name: index.name().to_string(),
                columns: index.columns().to_vec(),
            },
            None => Self::FullScan,
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { name, columns } => write!(f, "INDEX {name} ({})", columns.join(", ")),
            Self::FullScan => f.write_str("FULL SCAN"),
        }
    }
}

//! Secondary indexes over a loaded table.
//!
//! Keys are structural: the ordered tuple of a row's values for the index
//! columns. Two rows share a bucket only when every component is equal, so
//! values containing separator characters cannot collide.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::{IndexDefinition, IndexKind};
use crate::value::Value;

/// Position of a row inside its table.
pub type RowId = usize;

/// Ordered column list identifying what an index is keyed on. Column order
/// is significant: `(a, b)` and `(b, a)` are different signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSignature(Vec<String>);

impl IndexSignature {
    pub fn columns(&self) -> &[String] {
        &self.0
    }
}

impl From<&IndexDefinition> for IndexSignature {
    fn from(definition: &IndexDefinition) -> Self {
        Self(definition.columns.clone())
    }
}

/// A built index: key tuple to the ids of the rows holding that key, in row
/// order.
#[derive(Debug, Clone)]
pub struct Index {
    definition: IndexDefinition,
    signature: IndexSignature,
    /// Later definitions with the same signature, served by this index.
    aliases: Vec<IndexDefinition>,
    entries: HashMap<Vec<Value>, Vec<RowId>>,
    row_count: usize,
}

impl Index {
    /// Builds the index over `rows`.
    ///
    /// # Errors
    /// Returns [Error::InvalidField] if a row lacks one of the index columns.
    pub fn build(definition: IndexDefinition, rows: &[Row]) -> Result<Self> {
        let signature = IndexSignature::from(&definition);
        let mut entries: HashMap<Vec<Value>, Vec<RowId>> = HashMap::new();
        for (row_id, row) in rows.iter().enumerate() {
            let key = Self::key_of(signature.columns(), row)?;
            entries.entry(key).or_default().push(row_id);
        }

        let index = Self {
            definition,
            signature,
            aliases: Vec::new(),
            entries,
            row_count: rows.len(),
        };
        index.report_duplicates(&index.definition);
        Ok(index)
    }

    fn key_of(columns: &[String], row: &Row) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|column| {
                row.get(column)
                    .cloned()
                    .ok_or_else(|| Error::invalid_field(column.as_str()))
            })
            .collect()
    }

    // Uniqueness is recorded in the catalog but not enforced.
    fn report_duplicates(&self, definition: &IndexDefinition) {
        if !definition.kind.is_unique() {
            return;
        }
        let duplicated = self.duplicated_keys();
        if duplicated > 0 {
            tracing::warn!(
                index = %definition.name,
                kind = ?definition.kind,
                duplicated_keys = duplicated,
                "unique index has duplicate keys"
            );
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn kind(&self) -> IndexKind {
        self.definition.kind
    }

    pub fn columns(&self) -> &[String] {
        self.signature.columns()
    }

    pub fn signature(&self) -> &IndexSignature {
        &self.signature
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// True if this index answers to `name`, either its own or an alias.
    pub fn is_named(&self, name: &str) -> bool {
        self.definition.name == name || self.aliases.iter().any(|a| a.name == name)
    }

    /// True if this index or any of its aliases is PRIMARY or UNIQUE.
    pub fn is_unique(&self) -> bool {
        self.definition.kind.is_unique() || self.aliases.iter().any(|a| a.kind.is_unique())
    }

    /// Row ids stored under `key`; empty if the key is absent.
    pub fn lookup(&self, key: &[Value]) -> &[RowId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        self.entries.len()
    }

    /// Number of keys held by more than one row.
    pub fn duplicated_keys(&self) -> usize {
        self.entries.values().filter(|ids| ids.len() > 1).count()
    }

    /// Number of rows indexed.
    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// All indexes of one loaded table, in declaration order.
///
/// The only constructor builds every index from the complete row set, so a
/// set cannot outlive or be extended past the rows it was built from.
#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    indexes: Vec<Index>,
}

impl IndexSet {
    /// Builds one index per distinct signature among `definitions`.
    pub fn build(definitions: &[IndexDefinition], rows: &[Row]) -> Result<Self> {
        let mut indexes: Vec<Index> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let signature = IndexSignature::from(definition);
            if let Some(existing) = indexes.iter_mut().find(|i| i.signature == signature) {
                tracing::debug!(
                    index = %definition.name,
                    shared_with = %existing.name(),
                    "index signature already built"
                );
                existing.report_duplicates(definition);
                existing.aliases.push(definition.clone());
                continue;
            }
            let index = Index::build(definition.clone(), rows)?;
            tracing::debug!(
                index = %index.name(),
                columns = ?index.columns(),
                distinct_keys = index.distinct_keys(),
                "built index"
            );
            indexes.push(index);
        }
        Ok(Self { indexes })
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_named(name))
    }

    pub fn get_by_signature(&self, signature: &IndexSignature) -> Option<&Index> {
        self.indexes.iter().find(|i| &i.signature == signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::from_iter([("a", "x_y"), ("b", "z")]),
            Row::from_iter([("a", "x"), ("b", "y_z")]),
            Row::from_iter([("a", "x"), ("b", "y_z")]),
        ]
    }

    #[test]
    fn test_keys_are_structural() {
        let definition = IndexDefinition::new("ab", ["a", "b"], IndexKind::Index);
        let index = Index::build(definition, &rows()).unwrap();

        // "x_y"+"z" and "x"+"y_z" would both join to "x_y_z".
        assert_eq!(index.distinct_keys(), 2);
        assert_eq!(index.lookup(&[Value::from("x_y"), Value::from("z")]), &[0]);
        assert_eq!(index.lookup(&[Value::from("x"), Value::from("y_z")]), &[1, 2]);
        assert!(index.lookup(&[Value::from("x"), Value::from("z")]).is_empty());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_column_order_gives_distinct_signatures() {
        let set = IndexSet::build(
            &[
                IndexDefinition::new("ab", ["a", "b"], IndexKind::Index),
                IndexDefinition::new("ba", ["b", "a"], IndexKind::Index),
            ],
            &rows(),
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        let ba = set.get("ba").unwrap();
        assert_eq!(ba.lookup(&[Value::from("z"), Value::from("x_y")]), &[0]);
    }

    #[test]
    fn test_same_signature_is_built_once() {
        let set = IndexSet::build(
            &[
                IndexDefinition::new("PRIMARY", ["a"], IndexKind::Primary),
                IndexDefinition::new("a_again", ["a"], IndexKind::Index),
            ],
            &rows(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a_again").unwrap().name(), "PRIMARY");
        // Duplicate keys under PRIMARY are reported, not rejected.
        assert_eq!(set.get("PRIMARY").unwrap().lookup(&[Value::from("x")]), &[1, 2]);
    }

    #[test]
    fn test_unique_alias_of_plain_index_keeps_its_constraint() {
        let set = IndexSet::build(
            &[
                IndexDefinition::new("by_a", ["a"], IndexKind::Index),
                IndexDefinition::new("PRIMARY", ["a"], IndexKind::Primary),
            ],
            &rows(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        let shared = set.get("PRIMARY").unwrap();
        assert_eq!(shared.name(), "by_a");
        assert_eq!(shared.kind(), IndexKind::Index);
        assert!(shared.is_unique());
        assert_eq!(shared.duplicated_keys(), 1);
    }

    #[test]
    fn test_plain_index_is_not_unique() {
        let definition = IndexDefinition::new("ab", ["a", "b"], IndexKind::Index);
        let index = Index::build(definition, &rows()).unwrap();
        assert!(!index.is_unique());
        assert_eq!(index.duplicated_keys(), 1);
    }

    #[test]
    fn test_missing_column_fails_build() {
        let definition = IndexDefinition::new("c", ["c"], IndexKind::Index);
        assert!(matches!(
            Index::build(definition, &rows()),
            Err(Error::InvalidField { field }) if field == "c"
        ));
    }

    #[test]
    fn test_lookup_by_signature() {
        let set = IndexSet::build(&[IndexDefinition::new("b", ["b"], IndexKind::Unique)], &rows())
            .unwrap();
        let signature = IndexSignature::from(&IndexDefinition::new("x", ["b"], IndexKind::Index));
        assert_eq!(set.get_by_signature(&signature).unwrap().name(), "b");
        assert!(set.get("missing").is_none());
    }
}

use std::sync::Arc;

use bitvec::prelude::*;

use crate::access_path::{AccessPath, CostModel, CostModelKind, choose_index};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::index::{Index, IndexSet, RowId};
use crate::row::Row;
use crate::schema::TableDescription;
use crate::source::RecordSource;
use crate::template::Template;
use crate::value::Value;

/// How a table came to exist.
#[derive(Debug, Clone)]
pub enum TableKind {
    /// Loaded from a backing source according to a catalog description.
    /// Indexes were built once, after every row was loaded.
    Loaded {
        description: TableDescription,
        indexes: IndexSet,
        cost_model: CostModelKind,
    },
    /// Materialized from computed rows (join or projection output). No
    /// schema, no indexes: every selection is a full scan.
    Derived,
}

/// An in-memory, read-only table.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    rows: Vec<Row>,
    kind: TableKind,
}

impl Table {
    /// Loads `name` using its catalog description and builds its indexes.
    ///
    /// # Errors
    /// - [Error::UnknownTable] if the catalog does not know the table.
    /// - [Error::InvalidIndexColumns] if an index names an undefined column.
    /// - [Error::InvalidSource] if the backing source cannot be read.
    /// - [Error::InvalidField] if a source record lacks a defined column.
    pub fn load(name: &str, catalog: &dyn Catalog, source: &dyn RecordSource) -> Result<Self> {
        Self::load_with(name, catalog, source, CostModelKind::default())
    }

    /// Same as [Table::load], ranking indexes with `cost_model`.
    pub fn load_with(
        name: &str,
        catalog: &dyn Catalog,
        source: &dyn RecordSource,
        cost_model: CostModelKind,
    ) -> Result<Self> {
        let description = catalog.describe(name)?;
        description.validate()?;

        let rows = Self::load_rows(&description, source)?;
        let indexes = IndexSet::build(&description.indexes, &rows)?;
        tracing::info!(
            table = %name,
            rows = rows.len(),
            indexes = indexes.len(),
            "loaded table"
        );

        Ok(Self {
            name: name.to_string(),
            rows,
            kind: TableKind::Loaded {
                description,
                indexes,
                cost_model,
            },
        })
    }

    // Keeps only the defined columns, in schema order. Values are stored as
    // read: the declared column type is not applied.
    fn load_rows(description: &TableDescription, source: &dyn RecordSource) -> Result<Vec<Row>> {
        let columns: Vec<Arc<str>> = description
            .columns
            .iter()
            .map(|c| Arc::from(c.name.as_str()))
            .collect();

        let mut rows = Vec::new();
        for record in source.records(&description.source_path)? {
            let record = record?;
            let mut row = Row::with_capacity(columns.len());
            for column in &columns {
                let value = record
                    .get(column)
                    .ok_or_else(|| Error::invalid_field(column.as_ref()))?;
                row.push(Arc::clone(column), Value::from(value));
            }
            rows.push(row);
        }
        tracing::debug!(table = %description.name, rows = rows.len(), "read source records");
        Ok(rows)
    }

    /// Builds a derived table from computed rows.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
            kind: TableKind::Derived,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TableKind {
        &self.kind
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, TableKind::Derived)
    }

    /// The catalog description, for loaded tables.
    pub fn description(&self) -> Option<&TableDescription> {
        match &self.kind {
            TableKind::Loaded { description, .. } => Some(description),
            TableKind::Derived => None,
        }
    }

    /// The built indexes, for loaded tables.
    pub fn indexes(&self) -> Option<&IndexSet> {
        match &self.kind {
            TableKind::Loaded { indexes, .. } => Some(indexes),
            TableKind::Derived => None,
        }
    }

    /// Replaces the index ranking used by [Table::find_by_template]. No
    /// effect on derived tables.
    pub fn set_cost_model(&mut self, model: CostModelKind) {
        if let TableKind::Loaded { cost_model, .. } = &mut self.kind {
            *cost_model = model;
        }
    }

    /// All rows in load order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn get_row(&self, row_id: RowId) -> Option<&Row> {
        self.rows.get(row_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn choose_index(&self, template: &Template) -> Option<&Index> {
        self.choose_index_with(template, None)
    }

    fn choose_index_with(
        &self,
        template: &Template,
        cost: Option<&dyn CostModel>,
    ) -> Option<&Index> {
        match &self.kind {
            TableKind::Loaded {
                indexes,
                cost_model,
                ..
            } => choose_index(indexes, template, cost.unwrap_or(cost_model as &dyn CostModel)),
            TableKind::Derived => None,
        }
    }

    /// The access path [Table::find_by_template] would use for `template`.
    pub fn access_path(&self, template: Option<&Template>) -> AccessPath {
        match template.filter(|t| !t.is_empty()) {
            Some(template) => AccessPath::from(self.choose_index(template)),
            None => AccessPath::FullScan,
        }
    }

    /// The access path `cost` would pick for `template`.
    pub fn access_path_with(&self, template: &Template, cost: &dyn CostModel) -> AccessPath {
        AccessPath::from(self.choose_index_with(template, Some(cost)))
    }

    /// Returns the rows matching `template`, restricted to `fields`.
    ///
    /// Without a template (or with an empty one) every row is returned. With
    /// one, the best usable index is probed and each candidate re-checked
    /// against the full template; without a usable index, every row is
    /// scanned. Results follow row order on a scan and bucket order on an
    /// index lookup.
    ///
    /// # Errors
    /// - [Error::UnsupportedOperation] if `limit` or `offset` is given.
    /// - [Error::InvalidQuery] if the template names a column rows lack.
    /// - [Error::InvalidField] if `fields` names a column rows lack.
    pub fn find_by_template(
        &self,
        template: Option<&Template>,
        fields: Option<&[&str]>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Row>> {
        Self::check_paging(limit, offset)?;
        let Some(template) = template.filter(|t| !t.is_empty()) else {
            return project(self.rows.clone(), fields);
        };

        match self.choose_index(template) {
            Some(index) => {
                tracing::debug!(table = %self.name, index = %index.name(), "index lookup");
                self.index_lookup(index, template, fields)
            }
            None => {
                tracing::debug!(table = %self.name, "full scan");
                project(self.scan(template)?, fields)
            }
        }
    }

    /// [Table::find_by_template] forced onto a full scan.
    pub fn find_by_template_scan(
        &self,
        template: Option<&Template>,
        fields: Option<&[&str]>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Row>> {
        Self::check_paging(limit, offset)?;
        match template {
            Some(template) => project(self.scan(template)?, fields),
            None => project(self.rows.clone(), fields),
        }
    }

    /// [Table::find_by_template] forced onto the index named `index_name`.
    ///
    /// # Errors
    /// - [Error::UnknownIndex] if the table has no such index.
    /// - [Error::InvalidQuery] if the template leaves an index column
    ///   unconstrained.
    pub fn find_by_template_index(
        &self,
        template: &Template,
        index_name: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Row>> {
        let index = self
            .indexes()
            .and_then(|indexes| indexes.get(index_name))
            .ok_or_else(|| Error::UnknownIndex {
                table: self.name.clone(),
                index: index_name.to_string(),
            })?;
        self.index_lookup(index, template, fields)
    }

    fn check_paging(limit: Option<usize>, offset: Option<usize>) -> Result<()> {
        if limit.is_some() || offset.is_some() {
            return Err(Error::unsupported("limit/offset"));
        }
        Ok(())
    }

    fn index_lookup(
        &self,
        index: &Index,
        template: &Template,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Row>> {
        let key = template.key_for(index.columns()).ok_or_else(|| {
            let column = index
                .columns()
                .iter()
                .find(|c| template.get(c).is_none())
                .cloned()
                .unwrap_or_default();
            Error::invalid_query(column)
        })?;

        let mut result = Vec::new();
        for &row_id in index.lookup(&key) {
            let row = &self.rows[row_id];
            // The key only covers the index columns.
            if template.matches(row)? {
                result.push(row.clone());
            }
        }
        project(result, fields)
    }

    /// Marks every row matching `template`.
    fn select(&self, template: &Template) -> Result<BitVec> {
        let mut selection = bitvec![0; self.rows.len()];
        for (row_id, row) in self.rows.iter().enumerate() {
            if template.matches(row)? {
                selection.set(row_id, true);
            }
        }
        Ok(selection)
    }

    fn scan(&self, template: &Template) -> Result<Vec<Row>> {
        let selection = self.select(template)?;
        Ok(selection
            .iter_ones()
            .map(|row_id| self.rows[row_id].clone())
            .collect())
    }

    /// Tables are read-only once loaded.
    pub fn insert(&mut self, _row: Row) -> Result<()> {
        Err(Error::unsupported("insert"))
    }

    pub fn update(&mut self, _template: &Template, _changes: &Row) -> Result<usize> {
        Err(Error::unsupported("update"))
    }

    pub fn delete(&mut self, _template: &Template) -> Result<usize> {
        Err(Error::unsupported("delete"))
    }
}

/// Restricts each row to `fields`, in the listed order. `None` returns the
/// rows unchanged.
///
/// # Errors
/// Returns [Error::InvalidField] if any row lacks one of the fields; no
/// partial result is returned.
pub fn project<S: AsRef<str>>(rows: Vec<Row>, fields: Option<&[S]>) -> Result<Vec<Row>> {
    match fields {
        None => Ok(rows),
        Some(fields) => rows.iter().map(|row| row.project(fields)).collect(),
    }
}

/// Accumulates computed rows into a derived [Table].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    rows: Vec<Row>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(self) -> Table {
        Table::from_rows(self.name, self.rows)
    }
}

impl Extend<Row> for TableBuilder {
    fn extend<I: IntoIterator<Item = Row>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_path::DistinctKeys;
    use crate::catalog::MemoryCatalog;
    use crate::schema::{ColumnDefinition, IndexDefinition, IndexKind};
    use crate::source::MemorySource;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog
            .create_table(
                TableDescription::new("people", "people.csv")
                    .with_column(ColumnDefinition::text("id"))
                    .with_column(ColumnDefinition::text("last"))
                    .with_column(ColumnDefinition::text("first"))
                    .with_index(IndexDefinition::new("PRIMARY", ["id"], IndexKind::Primary))
                    .with_index(IndexDefinition::new(
                        "by_name",
                        ["last", "first"],
                        IndexKind::Index,
                    )),
            )
            .unwrap();
        catalog
    }

    fn source() -> MemorySource {
        MemorySource::new().with_file(
            "people.csv",
            ["id", "first", "last", "birth_city"],
            [
                ["1", "Ann", "Smith", "Lyon"],
                ["2", "Bob", "Smith", "Nice"],
                ["3", "Ann", "Jones", "Lyon"],
                ["4", "Ann", "Smith", "Paris"],
            ],
        )
    }

    fn people() -> Table {
        Table::load("people", &catalog(), &source()).unwrap()
    }

    fn sorted(mut rows: Vec<Row>) -> Vec<String> {
        let mut out: Vec<String> = rows.drain(..).map(|r| r.to_string()).collect();
        out.sort();
        out
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_load_keeps_schema_columns_in_order() {
        let table = people();
        assert_eq!(table.len(), 4);
        assert!(!table.is_derived());
        for row in table.rows() {
            assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "last", "first"]);
            assert!(!row.contains("birth_city"));
        }
        assert_eq!(table.get_row(1).unwrap().get("first"), Some(&Value::from("Bob")));
        assert_eq!(table.indexes().unwrap().len(), 2);
    }

    #[test]
    fn test_load_unknown_table() {
        let err = Table::load("nope", &catalog(), &source()).unwrap_err();
        assert!(matches!(err, Error::UnknownTable { .. }));
    }

    #[test]
    fn test_load_missing_source() {
        let err = Table::load("people", &catalog(), &MemorySource::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidSource { .. }));
    }

    #[test]
    fn test_load_source_missing_defined_column() {
        let source = MemorySource::new().with_file("people.csv", ["id", "last"], [["1", "Smith"]]);
        let err = Table::load("people", &catalog(), &source).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field } if field == "first"));
    }

    // ─────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_find_without_template_returns_everything() {
        let table = people();
        let all = table.find_by_template(None, None, None, None).unwrap();
        assert_eq!(all, table.rows().to_vec());

        let empty = Template::new();
        let all = table.find_by_template(Some(&empty), None, None, None).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_find_uses_index_and_rechecks_template() {
        let table = people();
        let template = Template::new().with("id", "1").with("first", "Bob");
        assert!(table.access_path(Some(&template)).is_index());
        assert!(table.find_by_template(Some(&template), None, None, None).unwrap().is_empty());

        let template = Template::new().with("last", "Smith").with("first", "Ann");
        assert_eq!(
            table.access_path(Some(&template)),
            AccessPath::Index {
                name: "by_name".into(),
                columns: vec!["last".into(), "first".into()],
            }
        );
        let ids: Vec<String> = table
            .find_by_template(Some(&template), Some(&["id"][..]), None, None)
            .unwrap()
            .iter()
            .map(|r| r.get("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_find_falls_back_to_scan() {
        let table = people();
        let template = Template::new().with("first", "Ann");
        assert_eq!(table.access_path(Some(&template)), AccessPath::FullScan);
        let rows = table.find_by_template(Some(&template), None, None, None).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_index_and_scan_agree() {
        let table = people();
        let templates = [
            Template::new().with("id", "2"),
            Template::new().with("id", "9"),
            Template::new().with("last", "Smith").with("first", "Ann"),
            Template::new().with("first", "Ann").with("last", "Jones"),
        ];
        for template in &templates {
            assert!(table.access_path(Some(template)).is_index());
            let via_index = table.find_by_template(Some(template), None, None, None).unwrap();
            let via_scan = table
                .find_by_template_scan(Some(template), None, None, None)
                .unwrap();
            assert_eq!(sorted(via_index), sorted(via_scan));
        }
    }

    #[test]
    fn test_forced_index_lookup() {
        let table = people();
        let template = Template::new().with("id", "3");
        let rows = table.find_by_template_index(&template, "PRIMARY", None).unwrap();
        assert_eq!(rows.len(), 1);

        let err = table
            .find_by_template_index(&Template::new().with("last", "Smith"), "by_name", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { column } if column == "first"));

        let err = table.find_by_template_index(&template, "nope", None).unwrap_err();
        assert!(matches!(err, Error::UnknownIndex { .. }));
    }

    #[test]
    fn test_template_with_unknown_column() {
        let table = people();
        let template = Template::new().with("age", "30");
        let err = table.find_by_template(Some(&template), None, None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { column } if column == "age"));
    }

    #[test]
    fn test_limit_and_offset_are_unsupported() {
        let table = people();
        let template = Template::new().with("id", "1");
        assert!(matches!(
            table.find_by_template(Some(&template), None, Some(5), None),
            Err(Error::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            table.find_by_template(None, None, None, Some(1)),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_cost_model_changes_choice() {
        let mut catalog = MemoryCatalog::new();
        catalog
            .create_table(
                TableDescription::new("people", "people.csv")
                    .with_column(ColumnDefinition::text("id"))
                    .with_column(ColumnDefinition::text("first"))
                    .with_index(IndexDefinition::new("by_first", ["first"], IndexKind::Index))
                    .with_index(IndexDefinition::new("PRIMARY", ["id"], IndexKind::Primary)),
            )
            .unwrap();
        let mut table = Table::load("people", &catalog, &source()).unwrap();
        let template = Template::new().with("first", "Ann").with("id", "3");

        // Equal column counts: the first declared index wins.
        assert!(matches!(
            table.access_path(Some(&template)),
            AccessPath::Index { name, .. } if name == "by_first"
        ));
        // Four distinct ids against two distinct first names.
        assert!(matches!(
            table.access_path_with(&template, &DistinctKeys),
            AccessPath::Index { name, .. } if name == "PRIMARY"
        ));

        table.set_cost_model(CostModelKind::DistinctKeys);
        assert!(matches!(
            table.access_path(Some(&template)),
            AccessPath::Index { name, .. } if name == "PRIMARY"
        ));
        let rows = table.find_by_template(Some(&template), None, None, None).unwrap();
        assert_eq!(rows.len(), 1);
    }

    // ─────────────────────────────────────────────────────────────
    // Projection
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_project() {
        let table = people();
        let rows = project(table.rows().to_vec(), Some(&["first", "id"][..])).unwrap();
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["first", "id"]);

        let unchanged = project::<&str>(table.rows().to_vec(), None).unwrap();
        assert_eq!(unchanged, table.rows().to_vec());

        let err = project(table.rows().to_vec(), Some(&["birth_city"][..])).unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_projection_is_idempotent() {
        let table = people();
        let fields = ["last", "id"];
        let once = project(table.rows().to_vec(), Some(&fields[..])).unwrap();
        let twice = project(once.clone(), Some(&fields[..])).unwrap();
        assert_eq!(once, twice);
    }

    // ─────────────────────────────────────────────────────────────
    // Derived tables
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_derived_table_always_scans() {
        let mut builder = TableBuilder::new("DERIVED");
        builder.extend(people().into_rows());
        builder.push(Row::from_iter([("id", "5"), ("last", "Doe"), ("first", "Jo")]));
        assert_eq!(builder.len(), 5);
        let derived = builder.finish();

        assert!(derived.is_derived());
        assert!(derived.description().is_none());
        assert!(derived.indexes().is_none());

        let template = Template::new().with("id", "5");
        assert_eq!(derived.access_path(Some(&template)), AccessPath::FullScan);
        let rows = derived.find_by_template(Some(&template), None, None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(
            derived.find_by_template_index(&template, "PRIMARY", None),
            Err(Error::UnknownIndex { .. })
        ));
    }

    #[test]
    fn test_mutations_are_unsupported() {
        let mut table = people();
        let template = Template::new().with("id", "1");
        assert!(matches!(
            table.insert(Row::new()),
            Err(Error::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            table.update(&template, &Row::new()),
            Err(Error::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            table.delete(&template),
            Err(Error::UnsupportedOperation { .. })
        ));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_find_by_id_index_and_scan() {
        let mut catalog = MemoryCatalog::new();
        catalog
            .create_table(
                TableDescription::new("A", "a.csv")
                    .with_column(ColumnDefinition::number("id"))
                    .with_column(ColumnDefinition::text("name"))
                    .with_index(IndexDefinition::new("PRIMARY", ["id"], IndexKind::Primary)),
            )
            .unwrap();
        let source =
            MemorySource::new().with_file("a.csv", ["id", "name"], [["1", "x"], ["2", "y"]]);
        let table = Table::load("A", &catalog, &source).unwrap();

        let template = Template::new().with("id", "2");
        let expected = vec![Row::from_iter([("id", "2"), ("name", "y")])];
        assert_eq!(table.find_by_template(Some(&template), None, None, None).unwrap(), expected);
        assert_eq!(
            table.find_by_template_scan(Some(&template), None, None, None).unwrap(),
            expected
        );
    }
}

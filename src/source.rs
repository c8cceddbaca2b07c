//! Backing sources that feed rows into a loaded table.
//!
//! A source is re-openable: each call to [RecordSource::records] starts a
//! fresh pass over the data.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{Reader, ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use crate::config::CsvReadOptions;
use crate::error::{Error, Result};

/// One record produced by a source: field name to raw string value.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    headers: Arc<[String]>,
    fields: StringRecord,
}

impl SourceRecord {
    /// Returns the raw value of `field`, if the source has such a column.
    pub fn get(&self, field: &str) -> Option<&str> {
        let position = self.headers.iter().position(|h| h == field)?;
        self.fields.get(position)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub type SourceRecords<'a> = Box<dyn Iterator<Item = Result<SourceRecord>> + 'a>;

/// Produces the records stored at a path.
pub trait RecordSource {
    /// Column names available in the source at `path`.
    fn headers(&self, path: &Path) -> Result<Vec<String>>;

    /// A fresh, lazy pass over every record at `path`.
    fn records<'a>(&'a self, path: &Path) -> Result<SourceRecords<'a>>;
}

/// [RecordSource] reading delimited text files with the `csv` crate.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    options: CsvReadOptions,
}

impl CsvSource {
    pub fn new(options: CsvReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CsvReadOptions {
        &self.options
    }

    fn open(&self, path: &Path) -> Result<(Arc<[String]>, Reader<File>)> {
        let invalid = |source| Error::InvalidSource {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(self.options.has_headers)
            .trim(if self.options.trim { Trim::All } else { Trim::None })
            .from_path(path)
            .map_err(invalid)?;

        let first = reader.headers().map_err(invalid)?;
        let headers: Vec<String> = if self.options.has_headers {
            first.iter().map(str::to_string).collect()
        } else {
            (0..first.len()).map(|i| i.to_string()).collect()
        };
        Ok((headers.into(), reader))
    }
}

impl RecordSource for CsvSource {
    fn headers(&self, path: &Path) -> Result<Vec<String>> {
        let (headers, _) = self.open(path)?;
        Ok(headers.to_vec())
    }

    fn records<'a>(&'a self, path: &Path) -> Result<SourceRecords<'a>> {
        let (headers, reader) = self.open(path)?;
        tracing::debug!(path = %path.display(), columns = headers.len(), "opened csv source");
        Ok(Box::new(CsvRecords {
            path: path.to_path_buf(),
            headers,
            inner: reader.into_records(),
        }))
    }
}

struct CsvRecords {
    path: PathBuf,
    headers: Arc<[String]>,
    inner: StringRecordsIntoIter<File>,
}

impl Iterator for CsvRecords {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.next()?;
        Some(
            next.map(|fields| SourceRecord {
                headers: Arc::clone(&self.headers),
                fields,
            })
            .map_err(|source| Error::InvalidSource {
                path: self.path.clone(),
                source,
            }),
        )
    }
}

/// In-memory [RecordSource], keyed by path. Useful for tests and for
/// feeding rows that never touch the filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, (Arc<[String]>, Vec<StringRecord>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `records` under `path`, with `headers` naming the fields.
    pub fn with_file<H, R, F>(mut self, path: impl Into<PathBuf>, headers: H, records: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = F>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let records = records
            .into_iter()
            .map(|fields| fields.into_iter().collect::<StringRecord>())
            .collect();
        self.files.insert(path.into(), (headers.into(), records));
        self
    }

    fn file(&self, path: &Path) -> Result<&(Arc<[String]>, Vec<StringRecord>)> {
        self.files.get(path).ok_or_else(|| Error::InvalidSource {
            path: path.to_path_buf(),
            source: csv::Error::from(io::Error::new(
                io::ErrorKind::NotFound,
                "no such in-memory source",
            )),
        })
    }
}

impl RecordSource for MemorySource {
    fn headers(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.file(path)?.0.to_vec())
    }

    fn records<'a>(&'a self, path: &Path) -> Result<SourceRecords<'a>> {
        let (headers, records) = self.file(path)?;
        Ok(Box::new(records.iter().map(move |fields| {
            Ok(SourceRecord {
                headers: Arc::clone(headers),
                fields: fields.clone(),
            })
        })))
    }
}

//! Bibliographic corpus loading, validation, and write-back.
//!
//! A corpus is an ordered table of records. Row order is significant: it is
//! the processing order for greedy topic assignment. Columns the core does
//! not use (`Abstract`, `Year`, authors, ...) are carried through untouched.

mod error;
mod table;

pub use error::CorpusError;
pub use table::{Table, TableFormat};

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

/// Title column (required).
pub const TITLE_COLUMN: &str = "Title";
/// Semicolon-delimited keyword column (required).
pub const KEYWORDS_COLUMN: &str = "Keywords";
/// Abstract column (optional, pass-through).
pub const ABSTRACT_COLUMN: &str = "Abstract";
/// Publication year column (optional, pass-through).
pub const YEAR_COLUMN: &str = "Year";
/// Side column holding normalized keywords in the model input corpus.
pub const NORMALIZED_KEYWORDS_COLUMN: &str = "Normalized keywords";
/// Output column written by summarization (greedy or optimal) assignment.
pub const SUMMARY_TOPIC_COLUMN: &str = "Summary topic";
/// Output column written by nearest-topic classification.
pub const ASSIGNED_TOPIC_COLUMN: &str = "Assigned Topic";

/// Columns every corpus must provide.
pub const REQUIRED_COLUMNS: [&str; 2] = [TITLE_COLUMN, KEYWORDS_COLUMN];

/// A read-only view of one corpus row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    /// Row position within the corpus (0-based).
    pub id: usize,
    pub title: &'a str,
    pub abstract_text: Option<&'a str>,
    /// Raw semicolon-delimited keyword text.
    pub keywords: &'a str,
    pub year: Option<u16>,
}

/// An ordered collection of bibliographic records backed by a [`Table`].
#[derive(Debug, Clone)]
pub struct Corpus {
    source: PathBuf,
    format: TableFormat,
    table: Table,
    title_index: usize,
    keywords_index: usize,
}

impl Corpus {
    /// Loads a corpus and checks the required columns before anything else
    /// touches it.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` when `Title` or `Keywords` is
    /// absent, or any read/parse error from the table layer.
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let format = TableFormat::from_path(path)?;
        let table = Table::read(path)?;
        let corpus = Self::from_table(table, path, format)?;
        let first_year = corpus.documents().filter_map(|doc| doc.year).min();
        let last_year = corpus.documents().filter_map(|doc| doc.year).max();
        info!(documents = corpus.len(), ?first_year, ?last_year, "Corpus loaded");
        Ok(corpus)
    }

    /// Wraps an in-memory table, validating required columns.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` when a required column is absent.
    pub fn from_table(
        table: Table,
        source: impl Into<PathBuf>,
        format: TableFormat,
    ) -> Result<Self, CorpusError> {
        let source = source.into();
        let name = source.display().to_string();
        let title_index = table.require_column(&name, TITLE_COLUMN)?;
        let keywords_index = table.require_column(&name, KEYWORDS_COLUMN)?;
        Ok(Self {
            source,
            format,
            table,
            title_index,
            keywords_index,
        })
    }

    /// Path the corpus was loaded from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Format family of the source file; output is written in the same family.
    #[must_use]
    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// Source file stem, used to name runs and outputs.
    #[must_use]
    pub fn batch_name(&self) -> String {
        self.source
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "corpus".to_string())
    }

    /// Underlying table.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when the corpus has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates documents in corpus order.
    pub fn documents(&self) -> impl Iterator<Item = Document<'_>> + '_ {
        let abstract_index = self.table.column_index(ABSTRACT_COLUMN);
        let year_index = self.table.column_index(YEAR_COLUMN);
        self.table.rows().iter().enumerate().map(move |(id, row)| Document {
            id,
            title: &row[self.title_index],
            abstract_text: abstract_index.map(|i| row[i].as_str()),
            keywords: &row[self.keywords_index],
            year: year_index.and_then(|i| parse_year(&row[i])),
        })
    }

    /// Cells of an arbitrary column.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` when the column is absent.
    pub fn column_texts(&self, name: &str) -> Result<Vec<&str>, CorpusError> {
        let index = self
            .table
            .require_column(&self.source.display().to_string(), name)?;
        Ok(self.table.column(index).collect())
    }

    /// Adds (or replaces) a side column with one value per document.
    ///
    /// # Errors
    /// Returns `CorpusError::ColumnLength` on a length mismatch.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), CorpusError> {
        self.table.set_column(name, values)
    }

    /// Removes documents whose abstract is missing or whitespace-only.
    ///
    /// Returns the number of documents removed. A corpus without an
    /// `Abstract` column is left as is.
    pub fn drop_empty_abstracts(&mut self) -> usize {
        if self.table.column_index(ABSTRACT_COLUMN).is_none() {
            return 0;
        }
        let keep: Vec<bool> = self
            .documents()
            .map(|doc| doc.abstract_text.is_some_and(|text| !text.trim().is_empty()))
            .collect();
        let before = self.table.len();
        let mut keep = keep.into_iter();
        self.table.retain_rows(|_| keep.next().unwrap_or(true));
        before - self.table.len()
    }

    /// Writes the corpus, including any added columns.
    ///
    /// # Errors
    /// Returns an error if the output format is unsupported or the write fails.
    pub fn write(&self, path: &Path) -> Result<(), CorpusError> {
        self.table.write(path)
    }
}

fn parse_year(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u16>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(float_year))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_year(value: f64) -> Option<u16> {
    (value.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&value)).then(|| value as u16)
}

//! Error types for tabular corpus operations.

use std::path::PathBuf;

use thiserror::Error;

/// Minimum normalized similarity for a header to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Errors that can occur while reading, validating, or writing tables.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// File system error reading or writing a table.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The table path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension does not name a supported tabular format.
    #[error("unsupported table format '{extension}' for {path}\n  Suggestion: {suggestion}")]
    UnsupportedFormat {
        /// The offending table path.
        path: PathBuf,
        /// Extension as found on disk (may be empty).
        extension: String,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// A spreadsheet workbook could not be opened, read, or saved.
    #[error("workbook error on {path}: {reason}")]
    Workbook {
        /// The workbook path.
        path: PathBuf,
        /// Message from the spreadsheet layer.
        reason: String,
    },

    /// Malformed delimited text.
    #[error("malformed table {path} at line {line}: {reason}")]
    Malformed {
        /// The table path.
        path: PathBuf,
        /// 1-based physical line number where the problem was detected.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// A column required by the caller is absent from the header row.
    #[error("{table} is missing required column '{column}'{}", suggestion_text(.suggestion.as_deref()))]
    MissingColumn {
        /// Human-readable name of the table (usually its path).
        table: String,
        /// The column that was required.
        column: String,
        /// Closest existing header, when one is close enough.
        suggestion: Option<String>,
    },

    /// A new column was supplied with the wrong number of values.
    #[error("column '{column}' has {actual} values but the table has {expected} rows")]
    ColumnLength {
        /// Column being added.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

fn suggestion_text(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

impl CorpusError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-table error.
    pub fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Creates a workbook error from any spreadsheet-layer failure.
    pub fn workbook(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Workbook {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unsupported-format error for the given path.
    pub fn unsupported_format(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            extension: extension.into(),
            suggestion: "Save the sheet as .xlsx, or export it as .csv or .tsv",
        }
    }

    /// Creates a missing-column error, suggesting the closest existing header.
    #[must_use]
    pub fn missing_column(table: impl Into<String>, column: &str, headers: &[String]) -> Self {
        let suggestion = headers
            .iter()
            .map(|header| {
                let score = strsim::normalized_levenshtein(
                    &header.to_lowercase(),
                    &column.to_lowercase(),
                );
                (header, score)
            })
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(header, _)| header.clone());

        Self::MissingColumn {
            table: table.into(),
            column: column.to_string(),
            suggestion,
        }
    }

    /// Returns true when this error reports a missing required column.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::MissingColumn { .. })
    }
}

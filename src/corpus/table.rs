//! On-disk tables: delimited text (CSV and TSV) with RFC 4180 quoting, and
//! xlsx workbooks.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use calamine::{Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, instrument};

use super::error::CorpusError;

/// Supported on-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values (spreadsheet export).
    Tsv,
    /// Excel workbook; only the first worksheet is read.
    Xlsx,
}

impl TableFormat {
    /// Detects the format from a path's extension.
    ///
    /// # Errors
    /// Returns `CorpusError::UnsupportedFormat` for anything other than
    /// `.csv`, `.tsv`, `.tab` or `.xlsx`.
    pub fn from_path(path: &Path) -> Result<Self, CorpusError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(CorpusError::unsupported_format(path, extension)),
        }
    }

    /// Field delimiter, or `None` for workbooks.
    #[must_use]
    pub fn delimiter(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Tsv => Some('\t'),
            Self::Xlsx => None,
        }
    }

    /// Canonical file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// An in-memory table: one header row plus string cells.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from headers and rows, padding short rows.
    ///
    /// Rows longer than the header row are truncated.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Reads a table from disk, detecting the format from the extension.
    ///
    /// # Errors
    /// Returns an error if the format is unsupported, the file cannot be
    /// read, or the content is malformed.
    #[instrument(fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self, CorpusError> {
        let format = TableFormat::from_path(path)?;
        let table = match format.delimiter() {
            Some(delimiter) => {
                let raw =
                    fs::read_to_string(path).map_err(|source| CorpusError::io(path, source))?;
                Self::parse(&raw, delimiter, path)?
            }
            None => read_workbook(path)?,
        };
        debug!(
            rows = table.len(),
            columns = table.headers.len(),
            "Table loaded"
        );
        Ok(table)
    }

    /// Parses delimited text. `origin` is only used in error messages.
    ///
    /// # Errors
    /// Returns `CorpusError::Malformed` for unterminated quotes or rows
    /// with more cells than the header row.
    pub fn parse(raw: &str, delimiter: char, origin: &Path) -> Result<Self, CorpusError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let records = split_records(raw, delimiter, origin)?;
        let mut records = records.into_iter();

        let Some((_, headers)) = records.next() else {
            return Ok(Self::default());
        };
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for (line, mut record) in records {
            if record.len() > headers.len() {
                return Err(CorpusError::malformed(
                    origin,
                    line,
                    format!(
                        "row has {} cells but the header has {}",
                        record.len(),
                        headers.len()
                    ),
                ));
            }
            record.resize(headers.len(), String::new());
            rows.push(record);
        }

        Ok(Self { headers, rows })
    }

    /// Writes the table to disk in the format implied by the extension.
    ///
    /// # Errors
    /// Returns an error if the format is unsupported or the write fails.
    #[instrument(skip(self), fields(path = %path.display(), rows = self.len()))]
    pub fn write(&self, path: &Path) -> Result<(), CorpusError> {
        let format = TableFormat::from_path(path)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| CorpusError::io(parent, source))?;
        }
        match format.delimiter() {
            Some(delimiter) => fs::write(path, self.to_delimited(delimiter))
                .map_err(|source| CorpusError::io(path, source)),
            None => write_workbook(self, path),
        }
    }

    /// Serializes the table to delimited text with a trailing newline.
    #[must_use]
    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers, delimiter);
        for row in &self.rows {
            write_record(&mut out, row, delimiter);
        }
        out
    }

    /// Header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact header name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns the index of a required column.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` naming `table_name`.
    pub fn require_column(&self, table_name: &str, name: &str) -> Result<usize, CorpusError> {
        self.column_index(name)
            .ok_or_else(|| CorpusError::missing_column(table_name, name, &self.headers))
    }

    /// Iterates the cells of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }

    /// Appends a column, or replaces its values when it already exists.
    ///
    /// # Errors
    /// Returns `CorpusError::ColumnLength` if `values` does not have one
    /// entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), CorpusError> {
        if values.len() != self.rows.len() {
            return Err(CorpusError::ColumnLength {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[String]) -> bool) {
        self.rows.retain(|row| keep(row));
    }
}

/// Reads the first worksheet. Its first used row is the header row.
fn read_workbook(path: &Path) -> Result<Table, CorpusError> {
    let file = File::open(path).map_err(|source| CorpusError::io(path, source))?;
    let mut workbook: Xlsx<_> =
        Xlsx::new(BufReader::new(file)).map_err(|err| CorpusError::workbook(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CorpusError::workbook(path, "workbook has no worksheets"))?
        .map_err(|err| CorpusError::workbook(path, err))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(ToString::to_string).collect::<Vec<String>>());
    let Some(headers) = rows.next() else {
        return Ok(Table::default());
    };
    let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
    Ok(Table::new(headers, rows.collect()))
}

/// Writes every cell as text into a single worksheet with a bold header row.
fn write_workbook(table: &Table, path: &Path) -> Result<(), CorpusError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, sheet_column(col, path)?, header, &header_format)
            .map_err(|err| CorpusError::workbook(path, err))?;
    }
    for (index, row) in table.rows.iter().enumerate() {
        let sheet_row = u32::try_from(index + 1)
            .map_err(|_| CorpusError::workbook(path, "too many rows for a worksheet"))?;
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            worksheet
                .write_string(sheet_row, sheet_column(col, path)?, cell)
                .map_err(|err| CorpusError::workbook(path, err))?;
        }
    }

    workbook
        .save(path)
        .map_err(|err| CorpusError::workbook(path, err))
}

fn sheet_column(index: usize, path: &Path) -> Result<u16, CorpusError> {
    u16::try_from(index).map_err(|_| CorpusError::workbook(path, "too many columns for a worksheet"))
}

/// Splits raw text into records, tagging each with its starting line.
fn split_records(
    raw: &str,
    delimiter: char,
    origin: &Path,
) -> Result<Vec<(usize, Vec<String>)>, CorpusError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut quote_line = 1usize;

    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
                quote_line = line;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push((record_line, std::mem::take(&mut record)));
                }
                record.clear();
                line += 1;
                record_line = line;
            }
            _ => {
                field.push(ch);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(CorpusError::malformed(
            origin,
            quote_line,
            "unterminated quoted field",
        ));
    }

    if field_started || !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }

    Ok(records)
}

fn write_record(out: &mut String, cells: &[String], delimiter: char) {
    for (index, cell) in cells.iter().enumerate() {
        if index > 0 {
            out.push(delimiter);
        }
        let needs_quotes = cell
            .chars()
            .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
        if needs_quotes {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

//! CSV source reader with per-column type inference
//!
//! A column's type is decided once, from every non-null cell in the file:
//! integer, then float, then boolean, then ISO date, falling back to text.
//! Text cells keep their raw content; trimming is the normalizer's job. Only an
//! empty cell or a null token is missing: a whitespace-only cell is text.

use crate::error::{EtlError, EtlResult};
use crate::resolver::validate_identifier;
use crate::rowset::{ColumnDescriptor, ColumnType, RowSet, Value};
use chrono::NaiveDate;
use northload_common::checksum::{checksum_bytes, ChecksumAlgorithm};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cell contents treated as missing values (in addition to empty cells).
/// Same set pandas recognizes by default.
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Field delimiter; must be a single ASCII character
    pub delimiter: char,
    pub null_tokens: Vec<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReaderOptions {
    pub fn validate(&self) -> EtlResult<()> {
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(EtlError::config(format!(
                "reader delimiter {:?} must be a single ASCII character other than quote or newline",
                self.delimiter
            )));
        }
        Ok(())
    }
}

/// A parsed source file together with its fingerprint
#[derive(Debug, Clone)]
pub struct Extract {
    pub rows: RowSet,
    /// SHA-256 of the raw file bytes
    pub checksum: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    options: ReaderOptions,
}

impl CsvReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// Read and type one CSV file.
    ///
    /// Any failure (missing file, bad UTF-8, ragged rows, bad header) is a
    /// [`EtlError::SourceUnavailable`] naming the path.
    pub fn read(&self, path: &Path) -> EtlResult<Extract> {
        let bytes = std::fs::read(path).map_err(|e| EtlError::source_unavailable(path, e))?;
        let checksum = checksum_bytes(&bytes, ChecksumAlgorithm::Sha256);
        let rows = self
            .parse(&bytes)
            .map_err(|reason| EtlError::source_unavailable(path, reason))?;

        debug!(
            path = %path.display(),
            rows = rows.len(),
            columns = rows.columns().len(),
            "source parsed"
        );

        Ok(Extract {
            rows,
            checksum,
            bytes: bytes.len() as u64,
        })
    }

    /// Parse CSV content. The error is a human-readable reason.
    pub fn parse(&self, content: &[u8]) -> Result<RowSet, String> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter as u8)
            .has_headers(true)
            .flexible(false)
            .from_reader(content);

        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
            return Err("missing header row".to_string());
        }

        let names: Vec<String> = headers.iter().map(str::to_string).collect();
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(format!("column {} has an empty name", idx + 1));
            }
            if names[..idx].contains(name) {
                return Err(format!("duplicate column name '{}'", name));
            }
            if let Err(EtlError::Config(reason)) = validate_identifier(name) {
                return Err(format!("column {}: {}", idx + 1, reason));
            }
        }

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;

        let mut candidates = vec![TypeCandidate::new(); names.len()];
        for record in &records {
            for (candidate, cell) in candidates.iter_mut().zip(record.iter()) {
                if !self.is_null(cell) {
                    candidate.update(cell.trim());
                }
            }
        }

        let columns: Vec<ColumnDescriptor> = names
            .into_iter()
            .zip(&candidates)
            .map(|(name, candidate)| ColumnDescriptor::new(name, candidate.decide()))
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        for (line, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(columns.len());
            for (column, cell) in columns.iter().zip(record.iter()) {
                let value = self.convert(column.kind, cell).ok_or_else(|| {
                    format!(
                        "row {}: value {:?} in column '{}' is not a valid {}",
                        line + 1,
                        cell,
                        column.name,
                        column.kind
                    )
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        RowSet::new(columns, rows)
    }

    fn is_null(&self, cell: &str) -> bool {
        if cell.is_empty() {
            return true;
        }
        let trimmed = cell.trim();
        !trimmed.is_empty() && self.options.null_tokens.iter().any(|t| t == trimmed)
    }

    fn convert(&self, kind: ColumnType, cell: &str) -> Option<Value> {
        if self.is_null(cell) {
            return Some(Value::Null);
        }
        let trimmed = cell.trim();
        match kind {
            ColumnType::Text => Some(Value::Text(cell.to_string())),
            ColumnType::Integer => trimmed.parse().ok().map(Value::Integer),
            ColumnType::Float => parse_float(trimmed).map(Value::Float),
            ColumnType::Boolean => parse_bool(trimmed).map(Value::Boolean),
            ColumnType::Date => parse_date(trimmed).map(Value::Date),
        }
    }
}

/// Tracks which types every non-null cell of a column still satisfies
#[derive(Debug, Clone)]
struct TypeCandidate {
    non_null: usize,
    integer: bool,
    float: bool,
    boolean: bool,
    date: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_null: 0,
            integer: true,
            float: true,
            boolean: true,
            date: true,
        }
    }

    fn update(&mut self, value: &str) {
        self.non_null += 1;
        self.integer = self.integer && value.parse::<i64>().is_ok();
        self.float = self.float && parse_float(value).is_some();
        self.boolean = self.boolean && parse_bool(value).is_some();
        self.date = self.date && parse_date(value).is_some();
    }

    fn decide(&self) -> ColumnType {
        if self.non_null == 0 {
            ColumnType::Text
        } else if self.integer {
            ColumnType::Integer
        } else if self.float {
            ColumnType::Float
        } else if self.boolean {
            ColumnType::Boolean
        } else if self.date {
            ColumnType::Date
        } else {
            ColumnType::Text
        }
    }
}

/// Decimal notation only: `inf`, `nan` and friends stay text.
fn parse_float(value: &str) -> Option<f64> {
    let numeric_chars = value
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !numeric_chars || !value.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

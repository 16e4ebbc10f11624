//! Input CSV reading with encoding auto-detection.
//!
//! Bytes are decoded (UTF-8, ISO-8859-1 or Windows-1252), parsed with the
//! configured delimiter, and every cell is normalized before any task sees it.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// One data row of the input CSV.
///
/// Cells keep the column order of the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line of the record in the source file (header is line 1).
    pub line: usize,
    cells: Vec<(String, String)>,
}

impl CsvRow {
    pub fn new(line: usize, cells: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut row = Self {
            line,
            cells: Vec::new(),
        };
        for (column, value) in cells {
            row.set(&column, value);
        }
        row
    }

    /// Build a row from literal pairs; values are normalized with `subdelimiter`.
    pub fn from_pairs<'a>(
        line: usize,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        subdelimiter: &str,
    ) -> Self {
        Self::new(
            line,
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), normalize_value(v, subdelimiter))),
        )
    }

    /// Cell value, `None` when the column does not exist.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Cell value, `None` when the column is absent or the cell is empty.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, column: &str, value: String) {
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    /// Column names in header order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

/// A record that could not be turned into a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: usize,
    pub message: String,
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Data rows, in file order
    pub rows: Vec<CsvRow>,
    /// Detected encoding
    pub encoding: String,
    /// Column headers, in file order
    pub headers: Vec<String>,
    /// Records skipped because they could not be read as rows
    pub rejected: Vec<RejectedRow>,
}

impl ParseResult {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and unknown encodings: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Normalize one cell: trim it, trim every sub-value, drop empty sub-values.
///
/// `" a | b ||c| "` with subdelimiter `|` becomes `"a|b|c"`.
pub fn normalize_value(raw: &str, subdelimiter: &str) -> String {
    let trimmed = raw.trim();
    if subdelimiter.is_empty() || !trimmed.contains(subdelimiter) {
        return trimmed.to_string();
    }
    trimmed
        .split(subdelimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(subdelimiter)
}

/// Parse a CSV file.
pub fn parse_csv_file(
    path: impl AsRef<Path>,
    delimiter: u8,
    subdelimiter: &str,
) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(&bytes, delimiter, subdelimiter)
}

/// Parse CSV bytes, detecting their encoding.
pub fn parse_bytes(bytes: &[u8], delimiter: u8, subdelimiter: &str) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let mut result = parse_str(&content, delimiter, subdelimiter)?;
    result.encoding = encoding;
    Ok(result)
}

/// Parse already-decoded CSV text.
pub fn parse_str(content: &str, delimiter: u8, subdelimiter: &str) -> CsvResult<ParseResult> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::Parse {
            line: 1,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut seen = HashSet::new();
    for header in &headers {
        if header.is_empty() {
            return Err(CsvError::InvalidHeader("blank column name".to_string()));
        }
        if !seen.insert(header.as_str()) {
            return Err(CsvError::InvalidHeader(format!(
                "column '{}' appears more than once",
                header
            )));
        }
    }

    let mut rows = Vec::new();
    let mut rejected = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                rejected.push(RejectedRow {
                    line: e.position().map_or(0, |p| p.line() as usize),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(rows.len() + 2, |p| p.line() as usize);

        // Blank lines are skipped by the reader; rows of empty cells are not.
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        // Short records get empty trailing cells; long ones cannot be mapped.
        if record.len() > headers.len() {
            rejected.push(RejectedRow {
                line,
                message: format!(
                    "record has {} fields but the header has {}",
                    record.len(),
                    headers.len()
                ),
            });
            continue;
        }

        let cells = headers.iter().enumerate().map(|(i, header)| {
            let cell = record.get(i).unwrap_or_default();
            (header.clone(), normalize_value(cell, subdelimiter))
        });
        rows.push(CsvRow::new(line, cells));
    }

    Ok(ParseResult {
        rows,
        encoding: "utf-8".to_string(),
        headers,
        rejected,
    })
}

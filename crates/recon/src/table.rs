//! In-memory tabular input/output.
//!
//! A [`Table`] is the exchange format between the engine and whatever loads
//! or renders spreadsheets: a header row plus string cells. Column lookup is
//! case-insensitive after trimming.

use std::fmt;

use serde::Serialize;

use crate::error::ReconError;
use crate::normalize::normalize_column_name;

/// Which side of the reconciliation a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Bank statement lines (RK).
    Statements,
    /// Payment orders (SP2D).
    Orders,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statements => write!(f, "RK"),
            Self::Orders => write!(f, "SP2D"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV text with a header row. The delimiter is sniffed among
    /// tab, semicolon, comma and pipe.
    pub fn from_csv(data: &str) -> Result<Self, ReconError> {
        let data = data.strip_prefix('\u{feff}').unwrap_or(data);
        let delimiter = sniff_delimiter(data);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose normalized name equals `name` normalized.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_column_name(name);
        self.headers
            .iter()
            .position(|h| normalize_column_name(h) == wanted)
    }

    /// Resolve every column in `names`, failing with the full list of
    /// missing ones.
    pub fn require_columns(&self, kind: TableKind, names: &[&str]) -> Result<Vec<usize>, ReconError> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => found.push(idx),
                None => missing.push((*name).to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(ReconError::MissingColumns { table: kind, columns: missing })
        }
    }

    /// Cell text, or "" for cells past the end of a short row.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Pick the delimiter that yields the most consistent (>1) field count
/// across the first lines.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let first = counts.first().copied().unwrap_or(0);
        if first <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == first).count() as u64;
        let score = consistent * first as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

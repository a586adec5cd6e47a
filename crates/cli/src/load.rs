// Input loading: delimited text through the engine's CSV reader, workbooks
// through calamine. Every cell becomes text; the engine does its own parsing.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use vouch_recon::{ReconError, Table};

use crate::exit_codes::{EXIT_INPUT, EXIT_USAGE};
use crate::CliError;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Load a table from `path`. `sheet` selects a worksheet in a workbook and
/// is rejected for delimited text.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        return read_workbook(path, sheet);
    }
    if sheet.is_some() {
        return Err(CliError::new(
            EXIT_USAGE,
            format!("{} is not a workbook; sheet selection does not apply", path.display()),
        ));
    }

    let text = read_file_as_utf8(path)?;
    Table::from_csv(&text)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("{}: {e}", path.display())))
}

/// Read file and convert to UTF-8 if needed. Treasury exports are often
/// Windows-1252.
fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| ReconError::Io(format!("cannot open {}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            tracing::debug!("{} is not UTF-8, decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table, CliError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot open {}: {e}", path.display())))?;

    let names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                CliError::new(EXIT_USAGE, format!("sheet '{wanted}' not found in {}", path.display()))
                    .with_hint(format!("available sheets: {}", names.join(", ")))
            })?,
        None => names.first().cloned().ok_or_else(|| {
            CliError::new(EXIT_INPUT, format!("{} contains no sheets", path.display()))
        })?,
    };

    let range = workbook.worksheet_range(&name).map_err(|e| {
        CliError::new(EXIT_INPUT, format!("cannot read sheet '{name}' of {}: {e}", path.display()))
    })?;

    let mut rows = range.rows().map(|r| r.iter().map(cell_text).collect::<Vec<String>>());
    let headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let body: Vec<Vec<String>> = rows
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
        .collect();

    tracing::debug!("{}: sheet '{name}', {} rows", path.display(), body.len());
    Ok(Table::new(headers, body))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_float(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => e.to_string(),
        Data::DateTime(dt) => {
            // 1900 date system assumed
            let serial = dt.as_f64();
            excel_serial_to_date(serial)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| serial.to_string())
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Integers without decimals, cent amounts with exactly two. Finer values
/// keep every digit but never exactly three after the point, which the
/// amount parser would read as thousands grouping.
fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    if ((n * 100.0).round() - n * 100.0).abs() < 1e-6 {
        return format!("{n:.2}");
    }
    let mut text = format!("{n}");
    if text.split_once('.').is_some_and(|(_, frac)| frac.len() == 3) {
        text.push('0');
    }
    text
}

/// Date part of an Excel serial (1900 system, day 0 = 1899-12-30).
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

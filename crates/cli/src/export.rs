// Result export: one workbook with both tables, or a pair of CSV files.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use vouch_recon::Table;

use crate::exit_codes::EXIT_OUTPUT;
use crate::CliError;

pub const SHEET_RESULT: &str = "Hasil Vouching";
pub const SHEET_UNUSED_ORDERS: &str = "SP2D Belum Terpakai";
pub const CSV_RESULT: &str = "hasil_vouching.csv";
pub const CSV_UNUSED_ORDERS: &str = "sp2d_belum_terpakai.csv";

fn output_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display()))
}

/// Write the statement table and the unused orders as two sheets.
pub fn write_workbook(path: &Path, statements: &Table, unused_orders: &Table) -> Result<(), CliError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook
        .add_worksheet()
        .set_name(SHEET_RESULT)
        .map_err(|e| output_err(path, e))?;
    write_sheet(sheet, statements, &header).map_err(|e| output_err(path, e))?;

    let sheet = workbook
        .add_worksheet()
        .set_name(SHEET_UNUSED_ORDERS)
        .map_err(|e| output_err(path, e))?;
    write_sheet(sheet, unused_orders, &header).map_err(|e| output_err(path, e))?;

    workbook.save(path).map_err(|e| output_err(path, e))?;
    Ok(())
}

fn write_sheet(sheet: &mut Worksheet, table: &Table, header: &Format) -> Result<(), XlsxError> {
    for (col, name) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, header)?;
    }
    for (row, values) in table.rows.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, value) in values.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(row, col as u16, value)?;
            }
        }
    }
    if !table.headers.is_empty() {
        sheet.set_freeze_panes(1, 0)?;
        sheet.autofit();
    }
    Ok(())
}

/// Write both tables as CSV into `dir`, creating it if needed.
pub fn write_csv_dir(dir: &Path, statements: &Table, unused_orders: &Table) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(|e| output_err(dir, e))?;
    write_csv(&dir.join(CSV_RESULT), statements)?;
    write_csv(&dir.join(CSV_UNUSED_ORDERS), unused_orders)?;
    Ok(())
}

fn write_csv(path: &Path, table: &Table) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| output_err(path, e))?;

    writer.write_record(&table.headers).map_err(|e| output_err(path, e))?;
    for row in &table.rows {
        writer.write_record(row).map_err(|e| output_err(path, e))?;
    }
    writer.flush().map_err(|e| output_err(path, e))?;
    Ok(())
}

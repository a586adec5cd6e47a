//! Result tables: the original rows with derived and linked columns appended.

use crate::model::ReconResult;
use crate::table::Table;

pub const COL_REFERENCE_CODE: &str = "kode_sp2d";
pub const COL_STATUS: &str = "status";
pub const COL_LINKED_REFERENCE: &str = "nosp2d_match";
pub const COL_LINKED_DATE: &str = "tglsp2d_match";
pub const COL_LINKED_AGENCY: &str = "skpd_match";

/// The statement table as loaded, plus reference code, status and the
/// linked payment order fields.
pub fn statement_table(source: &Table, result: &ReconResult) -> Table {
    let width = source.headers.len();
    let mut headers = source.headers.clone();
    headers.extend(
        [COL_REFERENCE_CODE, COL_STATUS, COL_LINKED_REFERENCE, COL_LINKED_DATE, COL_LINKED_AGENCY]
            .iter()
            .map(|h| h.to_string()),
    );

    let rows = result
        .statements
        .iter()
        .map(|s| {
            let mut row = source_row(source, s.record.row_index, width);
            row.push(s.record.reference_code.clone().unwrap_or_default());
            row.push(s.status.label().to_string());
            match &s.link {
                Some(link) => {
                    row.push(link.reference_number.clone());
                    row.push(
                        link.issue_date
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default(),
                    );
                    row.push(link.agency.clone());
                }
                None => row.extend([String::new(), String::new(), String::new()]),
            }
            row
        })
        .collect();

    Table::new(headers, rows)
}

/// Payment order rows no statement consumed, plus their reference code.
pub fn unmatched_order_table(source: &Table, result: &ReconResult) -> Table {
    let width = source.headers.len();
    let mut headers = source.headers.clone();
    headers.push(COL_REFERENCE_CODE.to_string());

    let rows = result
        .unmatched_orders
        .iter()
        .map(|o| {
            let mut row = source_row(source, o.row_index, width);
            row.push(o.reference_code.clone().unwrap_or_default());
            row
        })
        .collect();

    Table::new(headers, rows)
}

fn source_row(source: &Table, row: usize, width: usize) -> Vec<String> {
    (0..width).map(|col| source.cell(row, col).to_string()).collect()
}

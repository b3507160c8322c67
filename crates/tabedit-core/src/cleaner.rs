//! Row cleaner: duplicate and null row removal

use crate::edits::CleanOptions;
use crate::table::{CellValue, Row, Table};
use log::debug;
use std::collections::HashSet;

/// Remove duplicate rows (keeping the first) and then rows containing nulls,
/// as selected by `options`. Column types are left as they are.
///
/// Duplicates are removed first so rows that differ only in where their nulls
/// sit are still compared as loaded.
pub fn clean_rows(mut table: Table, options: CleanOptions) -> Table {
    let before = table.row_count();

    if options.drop_duplicates {
        table.rows = drop_duplicates(table.rows);
    }
    if options.drop_nulls {
        table.rows.retain(|row| !row.has_null());
    }

    if options.is_enabled() {
        debug!(
            "Cleaning removed {} of {} rows",
            before - table.row_count(),
            before
        );
    }
    table
}

fn drop_duplicates(rows: Vec<Row>) -> Vec<Row> {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(rows.len());
    let mut keep = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let key: Vec<CellKey> = row.cells.iter().map(CellKey::from).collect();
        if seen.insert(key) {
            keep.push(index);
        }
    }

    let mut keep = keep.into_iter().peekable();
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            if keep.peek() == Some(&index) {
                keep.next();
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

/// Hashable view of a cell
#[derive(PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Integer(i64),
    Float(u64),
    String(&'a str),
    Empty,
}

impl<'a> From<&'a CellValue> for CellKey<'a> {
    fn from(cell: &'a CellValue) -> Self {
        match cell {
            CellValue::Integer(i) => CellKey::Integer(*i),
            // -0.0 and 0.0 compare equal, so they must hash alike
            CellValue::Float(f) if *f == 0.0 => CellKey::Float(0f64.to_bits()),
            CellValue::Float(f) => CellKey::Float(f.to_bits()),
            CellValue::String(s) => CellKey::String(s),
            CellValue::Empty => CellKey::Empty,
        }
    }
}

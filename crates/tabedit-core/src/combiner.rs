//! Combine tables that share a schema into one table

use crate::error::{Error, Result};
use crate::table::Table;
use log::debug;

/// Concatenate the rows of `tables` in order.
///
/// Every table must have the same column names, in the same order, with the
/// same types as the first one. The result takes its columns from the first
/// table and has no source path.
pub fn combine_tables(tables: Vec<Table>) -> Result<Table> {
    let mut tables = tables.into_iter();
    let first = tables.next().ok_or(Error::NothingToCombine)?;

    let Table {
        columns, mut rows, ..
    } = first;
    let reference = Table {
        columns,
        rows: Vec::new(),
        source_path: None,
    };

    for (offset, table) in tables.enumerate() {
        let index = offset + 1;
        check_schema(&reference, &table, index)?;
        debug!(
            "Appending {} rows from table {} ({})",
            table.row_count(),
            index,
            source_name(&table, index)
        );
        rows.extend(table.rows);
    }

    Ok(Table { rows, ..reference })
}

/// Verify `table` has the same schema as `reference`, reporting the first
/// point where they diverge
pub fn check_schema(reference: &Table, table: &Table, index: usize) -> Result<()> {
    let mismatch = |detail: String| Error::SchemaMismatch {
        index,
        source_name: source_name(table, index),
        detail,
    };

    for (pos, (expected, found)) in reference.columns.iter().zip(&table.columns).enumerate() {
        if expected.name != found.name {
            return Err(mismatch(format!(
                "column {} is named '{}', expected '{}'",
                pos, found.name, expected.name
            )));
        }
        if expected.dtype != found.dtype {
            return Err(mismatch(format!(
                "column '{}' has type {}, expected {}",
                found.name, found.dtype, expected.dtype
            )));
        }
    }

    if reference.column_count() != table.column_count() {
        return Err(mismatch(format!(
            "has {} columns, expected {}",
            table.column_count(),
            reference.column_count()
        )));
    }

    Ok(())
}

fn source_name(table: &Table, index: usize) -> String {
    table
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("table #{}", index))
}

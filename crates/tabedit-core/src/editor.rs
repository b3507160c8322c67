//! Column editor: rename, delete and retype columns of a table
//!
//! Edits run in a fixed order: renames, then deletions, then casts. Cast
//! positions refer to the column layout after renaming but before deletion,
//! so a cast requested for the third column still targets that column when
//! an earlier one is deleted in the same batch.

use crate::cleaner::clean_rows;
use crate::edits::{CastType, EditSpec};
use crate::table::{CellValue, ColumnType, Table};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A non-fatal problem met while editing a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditWarning {
    /// A column could not be cast and was left unchanged
    Cast {
        column: String,
        target: CastType,
        message: String,
    },
    /// A rename would have produced two columns with the same name
    RenameConflict {
        position: usize,
        from: String,
        to: String,
    },
}

impl fmt::Display for EditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditWarning::Cast {
                column,
                target,
                message,
            } => write!(f, "could not convert column '{}' to {}: {}", column, target, message),
            EditWarning::RenameConflict { position, from, to } => write!(
                f,
                "cannot rename column {} ('{}') to '{}': name already in use",
                position, from, to
            ),
        }
    }
}

/// The edited table together with any warnings collected on the way
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub table: Table,
    pub warnings: Vec<EditWarning>,
}

/// Apply the column edits and then the row cleaning of an edit batch
pub fn apply_edits(table: Table, spec: &EditSpec) -> EditOutcome {
    let EditOutcome { table, warnings } = apply_column_edits(table, spec);
    EditOutcome {
        table: clean_rows(table, spec.clean),
        warnings,
    }
}

/// Apply the rename, delete and retype passes of an edit batch
pub fn apply_column_edits(mut table: Table, spec: &EditSpec) -> EditOutcome {
    let mut warnings = Vec::new();
    let mut delete = spec.delete.clone();

    rename_pass(&mut table, &spec.rename, &mut delete, &mut warnings);

    // Cast targets are resolved against the layout before deletion
    let width = table.column_count();
    let targets: Vec<(usize, CastType)> = spec
        .retype
        .iter()
        .enumerate()
        .filter_map(|(pos, target)| target.map(|t| (pos, t)))
        .filter(|(pos, _)| *pos < width)
        .collect();

    let positions = delete_pass(&mut table, &delete);

    for (pos, target) in targets {
        let Some(index) = positions[pos] else {
            debug!("Skipping cast of deleted column at position {}", pos);
            continue;
        };
        if let Err(message) = cast_column(&mut table, index, target) {
            let warning = EditWarning::Cast {
                column: table.columns[index].name.clone(),
                target,
                message,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
    }

    EditOutcome { table, warnings }
}

/// Rename columns by position as one batch.
///
/// Final names are settled before anything is applied, so chains and swaps
/// work. Renames that would leave two columns sharing a name are dropped
/// with a warning until the remaining names are unique.
fn rename_pass(
    table: &mut Table,
    names: &[String],
    delete: &mut [String],
    warnings: &mut Vec<EditWarning>,
) {
    let old_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let mut renamed: Vec<bool> = (0..old_names.len())
        .map(|pos| {
            names
                .get(pos)
                .is_some_and(|n| !n.is_empty() && *n != old_names[pos])
        })
        .collect();

    loop {
        let proposed: Vec<&str> = (0..old_names.len())
            .map(|pos| {
                if renamed[pos] {
                    names[pos].as_str()
                } else {
                    old_names[pos].as_str()
                }
            })
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in &proposed {
            *counts.entry(*name).or_default() += 1;
        }

        let clashes: Vec<usize> = (0..proposed.len())
            .filter(|&pos| renamed[pos] && counts[proposed[pos]] > 1)
            .collect();
        if clashes.is_empty() {
            break;
        }
        for pos in clashes {
            renamed[pos] = false;
            let warning = EditWarning::RenameConflict {
                position: pos,
                from: old_names[pos].clone(),
                to: names[pos].clone(),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
    }

    // Keep pending deletions pointed at the same columns
    for entry in delete.iter_mut() {
        let source = (0..old_names.len()).find(|&pos| renamed[pos] && old_names[pos] == *entry);
        if let Some(pos) = source {
            *entry = names[pos].clone();
        }
    }
    for (pos, column) in table.columns.iter_mut().enumerate() {
        if renamed[pos] {
            column.name = names[pos].clone();
        }
    }
}

/// Remove the named columns. Returns, for each column position before the
/// pass, its position afterwards (`None` when deleted).
fn delete_pass(table: &mut Table, delete: &[String]) -> Vec<Option<usize>> {
    let keep: Vec<bool> = table
        .columns
        .iter()
        .map(|c| !delete.contains(&c.name))
        .collect();

    let mut next = 0;
    let positions = keep
        .iter()
        .map(|&k| {
            k.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect();

    if keep.iter().all(|&k| k) {
        return positions;
    }

    let mut flags = keep.iter();
    table.columns.retain(|_| *flags.next().unwrap_or(&true));
    for row in &mut table.rows {
        let mut flags = keep.iter();
        row.cells.retain(|_| *flags.next().unwrap_or(&true));
    }

    positions
}

/// Cast one column in place. On error the column is untouched.
fn cast_column(table: &mut Table, index: usize, target: CastType) -> Result<(), String> {
    let cells = table
        .column_values(index)
        .map(|cell| cast_cell(cell, target))
        .collect::<Result<Vec<_>, _>>()?;

    for (row, cell) in table.rows.iter_mut().zip(cells) {
        row.cells[index] = cell;
    }
    table.columns[index].dtype = match target {
        CastType::Int => ColumnType::Integer,
        CastType::Float => ColumnType::Float,
        CastType::Str => ColumnType::String,
    };
    Ok(())
}

fn cast_cell(cell: &CellValue, target: CastType) -> Result<CellValue, String> {
    match target {
        CastType::Int => match to_number(cell) {
            Some(CellValue::Float(f)) if !f.is_finite() => Err(format!(
                "cannot convert non-finite value ({}) to integer",
                f
            )),
            // `as` truncates toward zero and saturates at the i64 bounds
            Some(CellValue::Float(f)) => Ok(CellValue::Integer(f as i64)),
            Some(CellValue::Integer(i)) => Ok(CellValue::Integer(i)),
            _ => Ok(CellValue::Integer(0)),
        },
        CastType::Float => Ok(to_number(cell)
            .map(|n| n.widen())
            .unwrap_or(CellValue::Empty)),
        CastType::Str => Ok(CellValue::String(cell.to_string())),
    }
}

/// Numeric reading of a cell; text is parsed, anything else has none
fn to_number(cell: &CellValue) -> Option<CellValue> {
    match cell {
        CellValue::Integer(_) | CellValue::Float(_) => Some(cell.clone()),
        CellValue::String(s) => match CellValue::parse(s) {
            n @ (CellValue::Integer(_) | CellValue::Float(_)) => Some(n),
            _ => None,
        },
        CellValue::Empty => None,
    }
}

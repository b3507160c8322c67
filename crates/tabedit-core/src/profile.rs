//! Column profiles: types, null counts and numeric summaries

use crate::table::{ColumnType, Table};
use serde::{Deserialize, Serialize};

/// Summary of a whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
}

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
    /// Present for integer and float columns with at least one value
    pub stats: Option<NumericStats>,
}

/// Descriptive statistics over the non-null values of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Profile every column of a table
pub fn profile_table(table: &Table) -> TableProfile {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let null_count = table.column_values(index).filter(|c| c.is_empty()).count();
            let stats = match column.dtype {
                ColumnType::Integer | ColumnType::Float => {
                    let values: Vec<f64> =
                        table.column_values(index).filter_map(|c| c.as_f64()).collect();
                    NumericStats::from_values(values)
                }
                _ => None,
            };
            ColumnProfile {
                name: column.name.clone(),
                dtype: column.dtype,
                null_count,
                stats,
            }
        })
        .collect();

    TableProfile {
        row_count: table.row_count(),
        column_count: table.column_count(),
        columns,
    }
}

impl NumericStats {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        });

        Some(Self {
            count,
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[count - 1],
        })
    }
}

/// Linear interpolation between closest ranks of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

//! Core table types for representing loaded tabular data

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Text values treated as missing when a cell is parsed
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// An in-memory table: named, typed columns over rows of equal width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
    /// Source file path, if the table was loaded from disk
    pub source_path: Option<PathBuf>,
}

impl Table {
    /// Build a table from header names and raw rows, inferring column types.
    ///
    /// Integer cells in columns inferred as `Float` are widened so every
    /// cell agrees with its column type.
    pub fn from_rows(
        names: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        source_path: Option<PathBuf>,
    ) -> Result<Self> {
        check_unique(names.iter().map(String::as_str))?;
        check_shape(names.len(), &rows)?;

        let mut rows: Vec<Row> = rows.into_iter().map(Row::new).collect();
        let mut columns = Vec::with_capacity(names.len());
        for (index, name) in names.into_iter().enumerate() {
            let dtype = ColumnType::infer(rows.iter().map(|r| &r.cells[index]));
            if dtype == ColumnType::Float {
                for row in &mut rows {
                    row.cells[index] = row.cells[index].widen();
                }
            }
            columns.push(Column::new(name, dtype));
        }

        Ok(Self {
            columns,
            rows,
            source_path,
        })
    }

    /// Build a table from columns whose types are already known
    pub fn with_columns(
        columns: Vec<Column>,
        rows: Vec<Row>,
        source_path: Option<PathBuf>,
    ) -> Result<Self> {
        check_unique(columns.iter().map(|c| c.name.as_str()))?;
        for (row, r) in rows.iter().enumerate() {
            if r.cells.len() != columns.len() {
                return Err(Error::Shape {
                    row,
                    expected: columns.len(),
                    found: r.cells.len(),
                });
            }
        }
        Ok(Self {
            columns,
            rows,
            source_path,
        })
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column types in order
    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.dtype).collect()
    }

    /// Iterate over the cells of one column
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |r| r.cells.get(index))
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::DuplicateColumn(name.to_string()));
        }
    }
    Ok(())
}

fn check_shape(width: usize, rows: &[Vec<CellValue>]) -> Result<()> {
    match rows.iter().position(|r| r.len() != width) {
        Some(row) => Err(Error::Shape {
            row,
            expected: width,
            found: rows[row].len(),
        }),
        None => Ok(()),
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table
    pub name: String,
    /// Inferred (or cast) type of the column's values
    pub dtype: ColumnType,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Uniform type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    /// Mixed numbers and text, or no values at all
    Unknown,
}

impl ColumnType {
    /// Infer a column type from its cells
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let (mut ints, mut floats, mut strings, mut nulls) = (0usize, 0usize, 0usize, 0usize);
        for cell in cells {
            match cell {
                CellValue::Integer(_) => ints += 1,
                CellValue::Float(_) => floats += 1,
                CellValue::String(_) => strings += 1,
                CellValue::Empty => nulls += 1,
            }
        }

        match (ints + floats, strings) {
            (0, 0) => ColumnType::Unknown,
            (_, 0) if floats == 0 && nulls == 0 => ColumnType::Integer,
            (_, 0) => ColumnType::Float,
            (0, _) => ColumnType::String,
            _ => ColumnType::Unknown,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "int",
            ColumnType::Float => "float",
            ColumnType::String => "str",
            ColumnType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    /// Whether any cell is null
    pub fn has_null(&self) -> bool {
        self.cells.iter().any(CellValue::is_empty)
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Missing value
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if NULL_TOKENS.contains(&trimmed) {
            return CellValue::Empty;
        }

        // Try parsing as integer first
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Some(f) = parse_float(trimmed) {
            return CellValue::Float(f);
        }

        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is null
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric value of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integers become floats; everything else is unchanged
    pub fn widen(&self) -> Self {
        match self {
            CellValue::Integer(i) => CellValue::Float(*i as f64),
            other => other.clone(),
        }
    }

    /// Convert to the string written to disk; nulls become an empty field
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            other => other.to_string(),
        }
    }
}

/// Parse a float, rejecting the spellings of NaN that `f64::from_str` accepts
fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| !f.is_nan())
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            // Keep a decimal point on whole floats so they read back as floats
            CellValue::Float(fl) if fl.is_finite() && fl.fract() == 0.0 && fl.abs() < 1e16 => {
                write!(f, "{:.1}", fl)
            }
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, "nan"),
        }
    }
}

//! Table loader for CSV, XLSX and delimited text files

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use calamine::{open_workbook, Data, Reader, Xlsx};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// File formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Comma-separated values with a header row
    Csv,
    /// First worksheet of an Excel workbook, header row
    Xlsx,
    /// Delimited text (pipe by default) with a header row
    Txt,
}

impl Format {
    /// All recognized formats
    pub const ALL: [Format; 3] = [Format::Csv, Format::Xlsx, Format::Txt];

    /// Look up a format by file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Format::Csv),
            "xlsx" => Some(Format::Xlsx),
            "txt" => Some(Format::Txt),
            _ => None,
        }
    }

    /// Determine the format of a path from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        Format::from_extension(ext).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: ext.to_string(),
        })
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Xlsx => "xlsx",
            Format::Txt => "txt",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Format-specific parsing options
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// Delimiter used for `.txt` files
    pub txt_delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { txt_delimiter: b'|' }
    }
}

/// Load a table from a file, choosing the parser from its extension
pub fn load_table<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> Result<Table> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    debug!("Loading {} as {}", path.display(), format);

    match format {
        Format::Csv => read_delimited_file(path, b','),
        Format::Txt => read_delimited_file(path, options.txt_delimiter),
        Format::Xlsx => read_xlsx(path),
    }
}

fn read_delimited_file(path: &Path, delimiter: u8) -> Result<Table> {
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_delimited(BufReader::new(file), delimiter, path.to_path_buf())
}

/// Parse delimited text from a string (useful for testing)
pub fn parse_delimited_str(content: &str, delimiter: u8, source_name: &str) -> Result<Table> {
    read_delimited(content.as_bytes(), delimiter, PathBuf::from(source_name))
}

fn read_delimited<R: Read>(reader: R, delimiter: u8, path: PathBuf) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true) // Short rows are padded below, long rows rejected
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::parse(&path, e))?;

    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| header_name(name, i))
        .collect();

    if names.is_empty() || (names.len() == 1 && headers.get(0) == Some("")) {
        return Err(Error::parse(&path, "no columns to parse from file"));
    }

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::parse(&path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() > names.len() {
            return Err(Error::parse(
                &path,
                format!(
                    "expected {} fields in line {}, saw {}",
                    names.len(),
                    line,
                    record.len()
                ),
            ));
        }

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
        if cells.len() < names.len() {
            warn!(
                "Line {} in {} has {} of {} fields, padding with nulls",
                line,
                path.display(),
                cells.len(),
                names.len()
            );
            cells.resize(names.len(), CellValue::Empty);
        }
        rows.push(cells);
    }

    table_from_parts(names, rows, path)
}

fn read_xlsx(path: &Path) -> Result<Table> {
    let mut workbook: Xlsx<BufReader<File>> =
        open_workbook(path).map_err(|e| Error::parse(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::parse(path, "workbook has no worksheets"))?
        .map_err(|e| Error::parse(path, e))?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .next()
        .ok_or_else(|| Error::parse(path, "no columns to parse from file"))?;

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => header_name("", i),
            other => header_name(&other.to_string(), i),
        })
        .collect();

    let rows: Vec<Vec<CellValue>> = sheet_rows
        .map(|row| row.iter().map(xlsx_cell).collect())
        .collect();

    table_from_parts(names, rows, path.to_path_buf())
}

fn xlsx_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::parse(s),
        Data::Bool(b) => CellValue::String(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::String(d.to_string()))
            .unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Blank headers get a positional placeholder name
fn header_name(raw: &str, index: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {}", index)
    } else {
        raw.to_string()
    }
}

fn table_from_parts(names: Vec<String>, rows: Vec<Vec<CellValue>>, path: PathBuf) -> Result<Table> {
    Table::from_rows(names, rows, Some(path.clone())).map_err(|e| Error::parse(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "ID,Name,Value\n1,foo,100\n2,bar,200\n";
        let table = parse_delimited_str(csv, b',', "test.csv").unwrap();

        assert_eq!(table.column_names(), vec!["ID", "Name", "Value"]);
        assert_eq!(
            table.column_types(),
            vec![ColumnType::Integer, ColumnType::String, ColumnType::Integer]
        );
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_parse_with_empty_cells() {
        let csv = "ID,Name,Value\n1,,100\n2,bar,\n";
        let table = parse_delimited_str(csv, b',', "test.csv").unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
        assert_eq!(table.rows[1].cells[2], CellValue::Empty);
        assert_eq!(table.columns[2].dtype, ColumnType::Float);
        assert_eq!(table.rows[0].cells[2], CellValue::Float(100.0));
    }

    #[test]
    fn test_parse_pipe_delimited() {
        let txt = "id|name\n1|a,b\n2|c\n";
        let table = parse_delimited_str(txt, b'|', "test.txt").unwrap();

        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.rows[0].cells[1], CellValue::String("a,b".into()));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "a,b,c\n1,2\n";
        let table = parse_delimited_str(csv, b',', "test.csv").unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let csv = "a,b\n1,2\n3,4,5\n";
        let err = parse_delimited_str(csv, b',', "test.csv").unwrap_err();

        match err {
            Error::Parse { message, .. } => {
                assert!(message.contains("expected 2 fields"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_content_is_a_parse_error() {
        let err = parse_delimited_str("", b',', "empty.csv").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_duplicate_headers_are_a_parse_error() {
        let err = parse_delimited_str("a,a\n1,2\n", b',', "dup.csv").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_blank_header_gets_placeholder() {
        let table = parse_delimited_str(",b\n1,2\n", b',', "test.csv").unwrap();
        assert_eq!(table.column_names(), vec!["Unnamed: 0", "b"]);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a.CSV").unwrap(), Format::Csv);
        assert_eq!(Format::from_path("dir/b.xlsx").unwrap(), Format::Xlsx);
        assert_eq!(Format::from_path("c.txt").unwrap(), Format::Txt);
        assert!(matches!(
            Format::from_path("d.json"),
            Err(Error::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            Format::from_path("noext"),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let err = load_table("table.json", &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { extension, .. } if extension == "json"));
    }

    #[test]
    fn test_load_txt_file_with_configured_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "id\tname\n1\tx\n").unwrap();

        let options = LoaderOptions { txt_delimiter: b'\t' };
        let table = load_table(&path, &options).unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.source_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_xlsx_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_string(0, 1, "score").unwrap();
        sheet.write_string(0, 2, "name").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_number(1, 1, 2.5).unwrap();
        sheet.write_string(1, 2, "ann").unwrap();
        sheet.write_number(2, 0, 2.0).unwrap();
        sheet.write_number(2, 1, 4.0).unwrap();
        sheet.write_string(2, 2, "bob").unwrap();
        let second = workbook.add_worksheet();
        second.write_string(0, 0, "ignored").unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path, &LoaderOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["id", "score", "name"]);
        assert_eq!(
            table.column_types(),
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::String]
        );
        assert_eq!(table.rows[1].cells[1], CellValue::Float(4.0));
    }

    #[test]
    fn test_load_corrupt_xlsx_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, "not a zip archive").unwrap();

        let err = load_table(&path, &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}

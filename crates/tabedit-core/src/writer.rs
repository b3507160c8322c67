//! CSV persistence for edited and combined tables

use crate::error::{Error, Result};
use crate::table::Table;
use log::info;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write a table as comma-separated values with a header row and no index.
///
/// The content goes to a temporary file next to `path` which then replaces
/// `path`, so a failure part way leaves any existing file untouched.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_csv_to(table, tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!(
        "Wrote {} rows x {} columns to {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(())
}

/// Write a table as CSV to any writer
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(table.columns.iter().map(|c| c.name.as_str()))
        .map_err(csv_io_error)?;

    for row in &table.rows {
        csv_writer
            .write_record(row.cells.iter().map(|c| c.to_string_value()))
            .map_err(csv_io_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render a table as a CSV string
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv_to(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn csv_io_error(e: csv::Error) -> Error {
    Error::Io(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_table, parse_delimited_str, LoaderOptions};
    use crate::table::CellValue;

    #[test]
    fn test_quotes_fields_when_needed() {
        let table = parse_delimited_str("a|b\nwith,comma|x\n\"q\"\"uote\"|y\n", b'|', "t.txt").unwrap();
        let out = to_csv_string(&table).unwrap();

        assert_eq!(out, "a,b\n\"with,comma\",x\n\"q\"\"uote\",y\n");
    }

    #[test]
    fn test_nulls_are_written_as_empty_fields() {
        let table = parse_delimited_str("a,b\n1,\n2,3.5\n", b',', "t.csv").unwrap();
        let out = to_csv_string(&table).unwrap();

        assert_eq!(out, "a,b\n1,\n2,3.5\n");
    }

    #[test]
    fn test_round_trip_preserves_names_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoaderOptions::default();

        let sources = [
            ("in.csv", "id,score,name\n1,2.0,a\n2,,b\n3,4.5,\n"),
            ("in.txt", "id|score|name\n1|2.0|a\n2||b\n3|4.5|\n"),
        ];

        for (name, content) in sources {
            let input = dir.path().join(name);
            std::fs::write(&input, content).unwrap();
            let original = load_table(&input, &options).unwrap();

            let output = dir.path().join(format!("out_{name}.csv"));
            write_csv(&original, &output).unwrap();
            let reloaded = load_table(&output, &options).unwrap();

            assert_eq!(reloaded.column_names(), original.column_names());
            assert_eq!(reloaded.column_types(), original.column_types());
            assert_eq!(reloaded.row_count(), original.row_count());
            assert_eq!(reloaded.rows, original.rows);
        }
    }

    #[test]
    fn test_round_trip_from_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["id", "score", "ok", "day", "note"].iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        let date_format = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        for (row, (id, score, ok)) in [(1.0, 2.0, true), (2.0, 4.5, false)].iter().enumerate() {
            let row = row as u32 + 1;
            sheet.write_number(row, 0, *id).unwrap();
            sheet.write_number(row, 1, *score).unwrap();
            sheet.write_boolean(row, 2, *ok).unwrap();
            let day = rust_xlsxwriter::ExcelDateTime::from_ymd(2024, 1, row as u8).unwrap();
            sheet.write_datetime_with_format(row, 3, &day, &date_format).unwrap();
        }
        // A blank cell between filled ones
        sheet.write_string(1, 4, "first").unwrap();
        sheet.write_string(2, 4, "").unwrap();
        workbook.save(&input).unwrap();

        let options = LoaderOptions::default();
        let original = load_table(&input, &options).unwrap();
        let output = dir.path().join("out.csv");
        write_csv(&original, &output).unwrap();
        let reloaded = load_table(&output, &options).unwrap();

        assert_eq!(reloaded.column_names(), original.column_names());
        assert_eq!(reloaded.column_types(), original.column_types());
        assert_eq!(reloaded.rows, original.rows);
        assert_eq!(original.rows[0].cells[0], CellValue::Integer(1));
        assert_eq!(original.rows[0].cells[1], CellValue::Float(2.0));
        assert_eq!(original.rows[1].cells[2], CellValue::String("False".into()));
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "old\n1\n").unwrap();

        let table = parse_delimited_str("new\n2\n", b',', "t.csv").unwrap();
        write_csv(&table, &path).unwrap();

        let reloaded = load_table(&path, &LoaderOptions::default()).unwrap();
        assert_eq!(reloaded.column_names(), vec!["new"]);
        assert_eq!(reloaded.rows[0].cells[0], CellValue::Integer(2));
    }
}

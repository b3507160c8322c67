//! Bounded previews of a table for display

use crate::table::{CellValue, ColumnType, Table};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// The first rows of a table rendered as display strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<String>>,
    /// Row count of the whole table
    pub total_rows: usize,
}

impl Preview {
    /// Capture up to `limit` leading rows of `table`
    pub fn of(table: &Table, limit: usize) -> Self {
        Self {
            columns: table.columns.iter().map(|c| c.name.clone()).collect(),
            types: table.column_types(),
            rows: table
                .rows
                .iter()
                .take(limit)
                .map(|row| row.cells.iter().map(display_cell).collect())
                .collect(),
            total_rows: table.row_count(),
        }
    }

    /// Rows left out of the preview
    pub fn remaining_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.rows.len())
    }

    /// Tab-separated listing with a header rule
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.columns.join("\t"));
        let _ = writeln!(out, "{}", "-".repeat(self.columns.len() * 12));
        for row in &self.rows {
            let _ = writeln!(out, "{}", row.join("\t"));
        }
        if self.remaining_rows() > 0 {
            let _ = writeln!(out, "... ({} more rows)", self.remaining_rows());
        }
        out
    }

    /// HTML table without an index column
    pub fn to_html(&self) -> String {
        let mut out = String::from("<table class=\"data table table-striped\">\n  <thead>\n    <tr>");
        for name in &self.columns {
            let _ = write!(out, "<th>{}</th>", escape_html(name));
        }
        out.push_str("</tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            out.push_str("    <tr>");
            for value in row {
                let _ = write!(out, "<td>{}</td>", escape_html(value));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("  </tbody>\n</table>");
        out
    }
}

fn display_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => "NaN".to_string(),
        other => other.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_delimited_str;

    fn sample() -> Table {
        parse_delimited_str(
            "id,name\n1,a\n2,\n3,c\n4,d\n5,e\n6,f\n7,g\n",
            b',',
            "t.csv",
        )
        .unwrap()
    }

    #[test]
    fn test_preview_is_bounded() {
        let preview = Preview::of(&sample(), 5);

        assert_eq!(preview.columns, vec!["id", "name"]);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.total_rows, 7);
        assert_eq!(preview.remaining_rows(), 2);
        assert_eq!(preview.rows[1], vec!["2", "NaN"]);
    }

    #[test]
    fn test_text_rendering() {
        let text = Preview::of(&sample(), 2).to_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id\tname");
        assert_eq!(lines[2], "1\ta");
        assert_eq!(lines.last(), Some(&"... (5 more rows)"));
    }

    #[test]
    fn test_html_rendering_escapes_content() {
        let table = parse_delimited_str("a<b\n<i>x</i>\n", b',', "t.csv").unwrap();
        let html = Preview::of(&table, 5).to_html();

        assert!(html.starts_with("<table class=\"data table table-striped\">"));
        assert!(html.contains("<th>a&lt;b</th>"));
        assert!(html.contains("<td>&lt;i&gt;x&lt;/i&gt;</td>"));
    }
}

//! tabedit-core: Core library for editing uploaded tabular files
//!
//! This library provides functionality to:
//! - Load CSV, XLSX and delimited text files into typed tables
//! - Rename, delete and retype columns from a declarative edit batch
//! - Remove duplicate and null rows
//! - Combine tables that share a schema
//! - Persist tables as CSV and render bounded previews
//! - Keep uploaded tables behind opaque handles

pub mod cleaner;
pub mod combiner;
pub mod config;
pub mod editor;
pub mod edits;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod preview;
pub mod profile;
pub mod scanner;
pub mod store;
pub mod table;
pub mod writer;

pub use cleaner::clean_rows;
pub use combiner::combine_tables;
pub use config::PipelineConfig;
pub use editor::{apply_column_edits, apply_edits, EditOutcome, EditWarning};
pub use edits::{CastType, CleanOptions, EditSpec};
pub use error::{Error, Result};
pub use loader::{load_table, parse_delimited_str, Format, LoaderOptions};
pub use pipeline::{Combined, EditReport, Pipeline, Upload};
pub use preview::Preview;
pub use profile::{profile_table, ColumnProfile, NumericStats, TableProfile};
pub use scanner::{scan_directory, ScanResult, TableFile};
pub use store::{StoredTable, TableHandle, TableStore};
pub use table::{CellValue, Column, ColumnType, Row, Table};
pub use writer::{to_csv_string, write_csv};

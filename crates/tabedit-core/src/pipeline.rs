//! The edit pipeline: load, edit, clean, persist and preview
//!
//! One [`Pipeline`] serves both path-addressed callers (the CLI) and
//! handle-addressed callers working through a [`TableStore`].

use crate::combiner::combine_tables;
use crate::config::PipelineConfig;
use crate::edits::EditSpec;
use crate::editor::{apply_edits, EditOutcome, EditWarning};
use crate::error::Result;
use crate::loader::{load_table, Format, LoaderOptions};
use crate::preview::Preview;
use crate::profile::{profile_table, TableProfile};
use crate::store::{TableHandle, TableStore};
use crate::table::Table;
use crate::writer::write_csv;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Result of running an edit batch over a table
#[derive(Debug, Clone)]
pub struct EditReport {
    pub table: Table,
    pub warnings: Vec<EditWarning>,
    pub preview: Preview,
}

/// A freshly stored upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub handle: TableHandle,
    pub preview: Preview,
}

/// A combined table and its preview
#[derive(Debug, Clone)]
pub struct Combined {
    pub table: Table,
    pub preview: Preview,
}

/// Entry point for every table operation
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    store: OnceLock<TableStore>,
}

impl Pipeline {
    /// Create a pipeline. The table store is opened on first use.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            store: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loader options derived from the configuration
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            txt_delimiter: self.config.txt_delimiter_byte(),
        }
    }

    /// The handle-addressed table store
    pub fn store(&self) -> Result<&TableStore> {
        if let Some(store) = self.store.get() {
            return Ok(store);
        }
        let store = TableStore::open(&self.config.storage_dir, self.loader_options())?;
        Ok(self.store.get_or_init(|| store))
    }

    /// Load a table from disk
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        load_table(path, &self.loader_options())
    }

    /// Preview with the configured row count
    pub fn preview(&self, table: &Table) -> Preview {
        Preview::of(table, self.config.preview_rows)
    }

    /// Apply an edit batch to an in-memory table
    pub fn edit_table(&self, table: Table, spec: &EditSpec) -> EditReport {
        let EditOutcome { table, warnings } = apply_edits(table, spec);
        let preview = self.preview(&table);
        EditReport {
            table,
            warnings,
            preview,
        }
    }

    /// Load `path`, apply `spec` and write the result as CSV.
    ///
    /// Without an explicit `output` a CSV source is overwritten; other
    /// formats are written next to the source with a `.csv` extension.
    /// Nothing is written unless loading and editing succeed.
    pub fn edit_file<P: AsRef<Path>>(
        &self,
        path: P,
        spec: &EditSpec,
        output: Option<&Path>,
    ) -> Result<(PathBuf, EditReport)> {
        let path = path.as_ref();
        let table = self.load(path)?;
        let report = self.edit_table(table, spec);

        let output = match output {
            Some(output) => output.to_path_buf(),
            None => default_output(path)?,
        };
        write_csv(&report.table, &output)?;
        Ok((output, report))
    }

    /// Load and combine several files
    pub fn combine_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Combined> {
        let tables = paths
            .iter()
            .map(|p| self.load(p))
            .collect::<Result<Vec<_>>>()?;
        self.combined(tables)
    }

    /// Store an uploaded file and preview it
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<Upload> {
        let (handle, table) = self.store()?.ingest(file_name, bytes)?;
        info!("Uploaded '{}' as {}", file_name, handle);
        Ok(Upload {
            handle,
            preview: self.preview(&table),
        })
    }

    /// Preview a stored table
    pub fn preview_stored(&self, handle: TableHandle) -> Result<Preview> {
        let table = self.store()?.load(handle)?;
        Ok(self.preview(&table))
    }

    /// Edit a stored table and persist the result.
    ///
    /// The table stays locked from load until the result is written, so
    /// concurrent edits of one handle apply one after the other.
    pub fn edit(&self, handle: TableHandle, spec: &EditSpec) -> Result<EditReport> {
        let store = self.store()?;
        store.with_table(handle, |stored| {
            let table = store.load_entry(stored)?;
            let report = self.edit_table(table, spec);
            store.persist(stored, &report.table)?;
            debug!(
                "Edited {}: {} rows, {} warnings",
                handle,
                report.table.row_count(),
                report.warnings.len()
            );
            Ok(report)
        })
    }

    /// Combine stored tables in the given order
    pub fn combine(&self, handles: &[TableHandle]) -> Result<Combined> {
        let store = self.store()?;
        let tables = handles
            .iter()
            .map(|h| store.load(*h))
            .collect::<Result<Vec<_>>>()?;
        self.combined(tables)
    }

    /// Profile a stored table
    pub fn profile(&self, handle: TableHandle) -> Result<TableProfile> {
        let table = self.store()?.load(handle)?;
        Ok(profile_table(&table))
    }

    fn combined(&self, tables: Vec<Table>) -> Result<Combined> {
        let table = combine_tables(tables)?;
        let preview = self.preview(&table);
        Ok(Combined { table, preview })
    }
}

fn default_output(path: &Path) -> Result<PathBuf> {
    Ok(match Format::from_path(path)? {
        Format::Csv => path.to_path_buf(),
        _ => path.with_extension(Format::Csv.extension()),
    })
}

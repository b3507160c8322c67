//! Registry of stored tables addressed by opaque handles
//!
//! Clients only ever see a [`TableHandle`]; the storage location behind it
//! stays server-side. Each entry carries its own lock so an edit holds the
//! table exclusively from load until its result is persisted.

use crate::error::{Error, Result};
use crate::loader::{load_table, Format, LoaderOptions};
use crate::table::Table;
use crate::writer::write_csv;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier of a stored table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableHandle(Uuid);

impl TableHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TableHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::UnknownHandle(s.to_string()))
    }
}

/// Where and what a stored table is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTable {
    pub handle: TableHandle,
    /// Current location of the table's data
    pub path: PathBuf,
    pub format: Format,
    /// File name the table was uploaded under
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Handle-addressed table storage under one directory
#[derive(Debug)]
pub struct TableStore {
    dir: PathBuf,
    loader: LoaderOptions,
    entries: RwLock<HashMap<TableHandle, Arc<Mutex<StoredTable>>>>,
}

impl TableStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P, loader: LoaderOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Using storage dir: {}", dir.display());
        Ok(Self {
            dir,
            loader,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store uploaded bytes and register them under a new handle.
    ///
    /// The content is loaded once to validate it; if that fails the stored
    /// file is removed and the load error returned.
    pub fn ingest(&self, file_name: &str, bytes: &[u8]) -> Result<(TableHandle, Table)> {
        let original_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name)
            .to_string();
        let format = Format::from_path(&original_name)?;

        let handle = TableHandle::new();
        let path = self.path_for(handle, format);
        fs::write(&path, bytes)?;

        let table = match self.load_labelled(&path, &original_name) {
            Ok(table) => table,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    warn!("Failed to remove rejected upload {}: {}", path.display(), rm);
                }
                return Err(e);
            }
        };

        self.register(StoredTable {
            handle,
            path,
            format,
            original_name,
            uploaded_at: Utc::now(),
        });
        Ok((handle, table))
    }

    /// Copy an existing file into the store
    pub fn import<P: AsRef<Path>>(&self, path: P) -> Result<(TableHandle, Table)> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.ingest(name, &bytes)
    }

    /// Snapshot of a stored table's entry
    pub fn get(&self, handle: TableHandle) -> Result<StoredTable> {
        Ok(self.entry(handle)?.lock().clone())
    }

    /// Handles of all stored tables
    pub fn handles(&self) -> Vec<TableHandle> {
        self.entries.read().keys().copied().collect()
    }

    /// Load the current content of a stored table
    pub fn load(&self, handle: TableHandle) -> Result<Table> {
        let entry = self.entry(handle)?;
        let stored = entry.lock();
        self.load_entry(&stored)
    }

    /// Run `f` with exclusive access to a stored table's entry
    pub fn with_table<T>(
        &self,
        handle: TableHandle,
        f: impl FnOnce(&mut StoredTable) -> Result<T>,
    ) -> Result<T> {
        let entry = self.entry(handle)?;
        let mut stored = entry.lock();
        f(&mut stored)
    }

    /// Load a stored table with this store's loader options
    pub fn load_entry(&self, stored: &StoredTable) -> Result<Table> {
        self.load_labelled(&stored.path, &stored.original_name)
    }

    /// Persist `table` as the new content of `stored`.
    ///
    /// Tables are always written as CSV; an entry that came from another
    /// format is repointed and its old file removed once the write succeeded.
    pub fn persist(&self, stored: &mut StoredTable, table: &Table) -> Result<()> {
        let path = self.path_for(stored.handle, Format::Csv);
        write_csv(table, &path)?;

        if stored.path != path {
            if let Err(e) = fs::remove_file(&stored.path) {
                warn!("Failed to remove {}: {}", stored.path.display(), e);
            }
            debug!("Table {} now stored as {}", stored.handle, path.display());
            stored.path = path;
            stored.format = Format::Csv;
        }
        Ok(())
    }

    /// Forget a stored table and delete its data
    pub fn remove(&self, handle: TableHandle) -> Result<()> {
        let entry = self
            .entries
            .write()
            .remove(&handle)
            .ok_or_else(|| Error::UnknownHandle(handle.to_string()))?;
        let stored = entry.lock();
        fs::remove_file(&stored.path)?;
        Ok(())
    }

    fn register(&self, stored: StoredTable) {
        debug!(
            "Registered '{}' as {} at {}",
            stored.original_name,
            stored.handle,
            stored.path.display()
        );
        self.entries
            .write()
            .insert(stored.handle, Arc::new(Mutex::new(stored)));
    }

    fn entry(&self, handle: TableHandle) -> Result<Arc<Mutex<StoredTable>>> {
        self.entries
            .read()
            .get(&handle)
            .cloned()
            .ok_or_else(|| Error::UnknownHandle(handle.to_string()))
    }

    /// Load a stored file, naming it by its upload name in the table and in
    /// errors so the storage path never leaves the store
    fn load_labelled(&self, path: &Path, label: &str) -> Result<Table> {
        let mut table = load_table(path, &self.loader).map_err(|e| e.with_path(label))?;
        table.source_path = Some(PathBuf::from(label));
        Ok(table)
    }

    fn path_for(&self, handle: TableHandle, format: Format) -> PathBuf {
        self.dir.join(format!("{}.{}", handle, format.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn store() -> (tempfile::TempDir, TableStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("uploads"), LoaderOptions::default()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_ingest_registers_table() {
        let (_dir, store) = store();
        let (handle, table) = store.ingest("people.csv", b"id,name\n1,a\n").unwrap();

        assert_eq!(table.column_names(), vec!["id", "name"]);
        let stored = store.get(handle).unwrap();
        assert_eq!(stored.original_name, "people.csv");
        assert_eq!(stored.format, Format::Csv);
        assert!(stored.path.starts_with(store.dir()));
        assert!(!stored.path.to_string_lossy().contains("people"));
        assert_eq!(store.handles(), vec![handle]);
        assert_eq!(table.source_path, Some(PathBuf::from("people.csv")));
        assert_eq!(store.load(handle).unwrap().source_path, Some(PathBuf::from("people.csv")));
    }

    #[test]
    fn test_ingest_strips_directories_from_name() {
        let (_dir, store) = store();
        let (handle, _) = store.ingest("../../etc/data.txt", b"a|b\n1|2\n").unwrap();

        let stored = store.get(handle).unwrap();
        assert_eq!(stored.original_name, "data.txt");
        assert!(stored.path.starts_with(store.dir()));
    }

    #[test]
    fn test_ingest_rejects_unsupported_format() {
        let (_dir, store) = store();
        let err = store.ingest("data.json", b"{}").unwrap_err();

        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_ingest_removes_unparseable_upload() {
        let (_dir, store) = store();
        let err = store.ingest("bad.csv", b"a,b\n1,2,3\n").unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        let message = err.to_string();
        assert!(message.starts_with("failed to parse 'bad.csv'"));
        assert!(!message.contains(&*store.dir().to_string_lossy()));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
        assert!(store.handles().is_empty());
    }

    #[test]
    fn test_persist_repoints_non_csv_entries() {
        let (_dir, store) = store();
        let (handle, table) = store.ingest("data.txt", b"a|b\n1|2\n").unwrap();
        let old_path = store.get(handle).unwrap().path;

        store
            .with_table(handle, |stored| store.persist(stored, &table))
            .unwrap();

        let stored = store.get(handle).unwrap();
        assert_eq!(stored.format, Format::Csv);
        assert_eq!(stored.path.extension().unwrap(), "csv");
        assert!(!old_path.exists());
        assert_eq!(store.load(handle).unwrap().rows[0].cells[1], CellValue::Integer(2));
    }

    #[test]
    fn test_unknown_handle() {
        let (_dir, store) = store();
        let handle: TableHandle = "6f1c5a44-3f55-4a8e-9a8c-0c5a2a1c9b11".parse().unwrap();

        assert!(matches!(store.get(handle), Err(Error::UnknownHandle(_))));
        assert!(matches!(store.remove(handle), Err(Error::UnknownHandle(_))));
        assert!(matches!("not-a-handle".parse::<TableHandle>(), Err(Error::UnknownHandle(_))));
    }

    #[test]
    fn test_remove_deletes_data() {
        let (_dir, store) = store();
        let (handle, _) = store.ingest("a.csv", b"a\n1\n").unwrap();
        let path = store.get(handle).unwrap().path;

        store.remove(handle).unwrap();
        assert!(!path.exists());
        assert!(store.get(handle).is_err());
    }
}

//! Directory scanner for discovering loadable tabular files

use crate::error::Result;
use crate::loader::Format;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file the loader can read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Format implied by the extension
    pub format: Format,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered files, sorted by path
    pub files: Vec<TableFile>,
}

impl ScanResult {
    /// Files of one format
    pub fn files_of(&self, format: Format) -> impl Iterator<Item = &TableFile> + '_ {
        self.files.iter().filter(move |f| f.format == format)
    }
}

/// Scan one or more directories for files with a supported extension
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut files = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Format::from_extension);

            if let Some(format) = format {
                files.push(TableFile {
                    path: path.to_path_buf(),
                    format,
                });
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_finds_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("notes.md"), "# hi").unwrap();
        fs::write(nested.join("a.TXT"), "a\n1\n").unwrap();
        fs::write(nested.join("c.xlsx"), "").unwrap();

        let result = scan_directory(&[dir.path()]).unwrap();

        let names: Vec<_> = result
            .files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("b.csv"),
                PathBuf::from("nested/a.TXT"),
                PathBuf::from("nested/c.xlsx"),
            ]
        );
        assert_eq!(result.files_of(Format::Txt).count(), 1);
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(scan_directory(&[missing]).is_err());
    }
}

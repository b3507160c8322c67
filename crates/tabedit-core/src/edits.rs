//! Declarative edit requests
//!
//! An [`EditSpec`] describes a batch of column renames, deletions, type casts
//! and row cleaning. It can be built in code, decoded from form key/value
//! pairs, or stored as JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Target type of a column cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    Int,
    Float,
    Str,
}

impl FromStr for CastType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(CastType::Int),
            "float" => Ok(CastType::Float),
            "str" => Ok(CastType::Str),
            other => Err(Error::InvalidEditSpec(format!(
                "unknown column type '{}' (expected int, float or str)",
                other
            ))),
        }
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CastType::Int => "int",
            CastType::Float => "float",
            CastType::Str => "str",
        };
        f.write_str(name)
    }
}

/// Row removals applied after the column edits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Drop exact duplicate rows, keeping the first occurrence
    #[serde(default)]
    pub drop_duplicates: bool,
    /// Drop rows containing any null
    #[serde(default)]
    pub drop_nulls: bool,
}

impl CleanOptions {
    /// Both removals enabled
    pub fn all() -> Self {
        Self {
            drop_duplicates: true,
            drop_nulls: true,
        }
    }

    /// Whether any removal is requested
    pub fn is_enabled(&self) -> bool {
        self.drop_duplicates || self.drop_nulls
    }
}

/// A batch of edits for one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditSpec {
    /// New column names by position; empty strings keep the current name
    #[serde(default)]
    pub rename: Vec<String>,
    /// Target types by position; `None` keeps the column as is
    #[serde(default)]
    pub retype: Vec<Option<CastType>>,
    /// Names of columns to remove
    #[serde(default)]
    pub delete: Vec<String>,
    /// Row cleaning
    #[serde(default)]
    pub clean: CleanOptions,
}

impl EditSpec {
    /// An empty edit batch that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the column at `position`
    pub fn rename(mut self, position: usize, name: impl Into<String>) -> Self {
        if self.rename.len() <= position {
            self.rename.resize(position + 1, String::new());
        }
        self.rename[position] = name.into();
        self
    }

    /// Cast the column at `position`
    pub fn retype(mut self, position: usize, target: CastType) -> Self {
        if self.retype.len() <= position {
            self.retype.resize(position + 1, None);
        }
        self.retype[position] = Some(target);
        self
    }

    /// Delete a column by name
    pub fn delete(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.delete.contains(&name) {
            self.delete.push(name);
        }
        self
    }

    /// Set the row cleaning options
    pub fn clean(mut self, clean: CleanOptions) -> Self {
        self.clean = clean;
        self
    }

    /// True when applying this batch would not change a table
    pub fn is_noop(&self) -> bool {
        self.rename.iter().all(String::is_empty)
            && self.retype.iter().all(Option::is_none)
            && self.delete.is_empty()
            && !self.clean.is_enabled()
    }

    /// Build an edit batch from submitted form fields.
    ///
    /// Repeated keys form the positional lists. Recognized keys:
    /// `rename`/`new_names`, `retype`/`new_types`, `delete`/`columns_to_delete`,
    /// `clean_nulls_and_duplicates`/`eliminar_nulos`, and the separate
    /// `drop_duplicates`/`drop_nulls` switches. Other keys are ignored.
    pub fn from_form<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = EditSpec::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "rename" | "new_names" => spec.rename.push(value.trim().to_string()),
                "retype" | "new_types" => {
                    let target = if value.trim().is_empty() {
                        None
                    } else {
                        Some(value.parse::<CastType>()?)
                    };
                    spec.retype.push(target);
                }
                "delete" | "columns_to_delete" => {
                    if !value.is_empty() && !spec.delete.iter().any(|d| d == value) {
                        spec.delete.push(value.to_string());
                    }
                }
                "clean_nulls_and_duplicates" | "eliminar_nulos" => {
                    if is_truthy(value) {
                        spec.clean = CleanOptions::all();
                    }
                }
                "drop_duplicates" => spec.clean.drop_duplicates |= is_truthy(value),
                "drop_nulls" => spec.clean.drop_nulls |= is_truthy(value),
                _ => {}
            }
        }

        Ok(spec)
    }

    /// Load an edit batch from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the edit batch to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// A checkbox counts as set unless its value reads as false
fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "off" | "0" | "no"
    )
}

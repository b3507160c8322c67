//! Pipeline configuration
//!
//! Values come from built-in defaults, an optional TOML file and `TABEDIT_*`
//! environment variables, in that order of precedence (last wins).

use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration passed explicitly to the pipeline at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding uploaded and edited tables
    #[serde(default = "PipelineConfig::default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Number of rows shown in previews
    #[serde(default = "PipelineConfig::default_preview_rows")]
    pub preview_rows: usize,
    /// Field delimiter for `.txt` files
    #[serde(default = "PipelineConfig::default_txt_delimiter")]
    pub txt_delimiter: char,
}

impl PipelineConfig {
    fn default_storage_dir() -> PathBuf {
        PathBuf::from("uploads")
    }

    fn default_preview_rows() -> usize {
        5
    }

    fn default_txt_delimiter() -> char {
        '|'
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize::<PipelineConfig>)
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional TOML file, overlaid with the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder
            .add_source(Environment::with_prefix("TABEDIT"))
            .build()
            .and_then(Config::try_deserialize::<PipelineConfig>)
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.txt_delimiter.is_ascii() {
            return Err(Error::Config(format!(
                "txt_delimiter must be a single ASCII character, got '{}'",
                self.txt_delimiter
            )));
        }
        Ok(())
    }

    /// The `.txt` delimiter as the byte the csv reader expects
    pub fn txt_delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII; fall back to the default otherwise
        u8::try_from(self.txt_delimiter).unwrap_or(b'|')
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_dir: Self::default_storage_dir(),
            preview_rows: Self::default_preview_rows(),
            txt_delimiter: Self::default_txt_delimiter(),
        }
    }
}

//! Runtime configuration.
//!
//! Read from `cql.toml` at the project root when present. Every key is
//! optional; CLI flags override whatever the file sets.
//!
//! ```toml
//! data_dir = "example"
//! schema_file = "example/.schema.json"
//! debounce_ms = 200
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CqlError, Result};

/// Config file name looked up at the project root.
pub const CONFIG_FILE: &str = "cql.toml";

/// Descriptor file name used when `schema_file` is not set.
pub const DEFAULT_SCHEMA_FILE: &str = ".schema.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one data file per collection.
    pub data_dir: PathBuf,
    /// Type descriptor document. Defaults to `<data_dir>/.schema.json`.
    pub schema_file: Option<PathBuf>,
    /// Extension of collection data files.
    pub data_extension: String,
    /// Watch data files and publish changes.
    pub watch: bool,
    /// Debounce window for file events, in milliseconds.
    pub debounce_ms: u64,
    /// Query depth limit.
    pub max_depth: usize,
    /// Query complexity limit.
    pub max_complexity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            schema_file: None,
            data_extension: "json".to_string(),
            watch: true,
            debounce_ms: 200,
            max_depth: 10,
            max_complexity: 1000,
        }
    }
}

impl Config {
    /// Load `cql.toml` from `root`, falling back to defaults when absent.
    ///
    /// Relative paths in the result are resolved against `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let config = if path.exists() {
            debug!(path = %path.display(), "loading config");
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(config.resolve(root))
    }

    /// Parse a config file without resolving paths.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CqlError::Config(e.to_string()))
    }

    /// Resolve relative paths against `root`.
    pub fn resolve(mut self, root: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = root.join(&self.data_dir);
        }
        if let Some(schema) = self.schema_file.take() {
            self.schema_file = Some(if schema.is_relative() {
                root.join(schema)
            } else {
                schema
            });
        }
        self
    }

    /// Effective descriptor path.
    pub fn schema_path(&self) -> PathBuf {
        self.schema_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_SCHEMA_FILE))
    }
}

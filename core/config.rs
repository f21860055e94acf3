//! The service manifest: where the three artifacts live and which fallback
//! values the encoder uses for the derived averages.
//!
//! ```toml
//! schema = "columnas_originales.toml"
//! selector = "selector_kbest.toml"
//! model = "modelo.toml"
//!
//! [defaults]
//! promedio_lineas = 0.0
//! promedio_areas = 0.0
//! ```
//!
//! Relative artifact paths are resolved against the directory of the manifest.

use crate::encoder::EncoderDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read service configuration '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse service configuration '{}': {source}", .path.display())]
    TomlParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize service configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Failed to write service configuration: {0}")]
    WriteError(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Ordered feature-column names.
    pub schema: PathBuf,
    /// Feature selector artifact.
    pub selector: PathBuf,
    /// Classifier artifact.
    pub model: PathBuf,
    #[serde(default)]
    pub defaults: EncoderDefaults,
}

impl ServiceConfig {
    /// Reads the manifest and resolves artifact paths relative to it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolved_against(base))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn resolved_against(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            schema: resolve(self.schema),
            selector: resolve(self.selector),
            model: resolve(self.model),
            defaults: self.defaults,
        }
    }
}

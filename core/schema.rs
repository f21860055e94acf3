//! # Feature Schema Registry
//!
//! The ordered list of feature-column names the trained artifacts were fit on.
//! The order is the contract: the selector and the classifier address columns
//! by position, so every row the encoder emits follows `columns()` exactly.
//!
//! The registry is loaded once at startup and never mutated. A registry that
//! cannot be loaded, is empty, or names a column twice is a fatal condition.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// On-disk layout of a TOML schema file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    columns: Vec<String>,
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML schema file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize schema to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("The feature schema contains no columns. The service cannot run without one.")]
    Empty,
    #[error("Column '{name}' appears more than once in the feature schema (positions {first} and {second}).")]
    DuplicateColumn {
        name: String,
        first: usize,
        second: usize,
    },
}

/// Ordered, immutable set of feature-column names.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: AHashMap<String, usize>,
}

impl FeatureSchema {
    /// Builds a registry from column names in canonical order.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut index = AHashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if let Some(first) = index.insert(name.clone(), position) {
                return Err(SchemaError::DuplicateColumn {
                    name: name.clone(),
                    first,
                    second: position,
                });
            }
        }

        Ok(Self { columns, index })
    }

    /// Loads a registry from disk.
    ///
    /// Files ending in `.txt` hold one column name per line; anything else is
    /// parsed as TOML with a single `columns` array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        let columns = if path.extension().is_some_and(|ext| ext == "txt") {
            text.lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()
        } else {
            toml::from_str::<SchemaFile>(&text)?.columns
        };

        let schema = Self::new(columns)?;
        log::info!(
            "Loaded feature schema with {} columns from {}",
            schema.len(),
            path.display()
        );
        Ok(schema)
    }

    /// Writes the registry as a TOML schema file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let text = toml::to_string_pretty(&SchemaFile {
            columns: self.columns.clone(),
        })?;
        fs::write(path, text)?;
        Ok(())
    }

    /// The canonical column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in the canonical order, if the schema defines it.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

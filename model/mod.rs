//! Trained artifacts consumed after encoding: the feature selector, the
//! classifier, and the pipeline that chains them.
//!
//! Artifacts are persisted as human-readable TOML and loaded once at startup.
//! Structural problems are reported when an artifact is loaded; shape
//! mismatches discovered while scoring a row are per-request errors.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub mod classifier;
pub mod pipeline;
pub mod selector;
pub mod tree;

pub use classifier::{Classifier, ClassifierArtifact, GradientBoosting, LogisticModel, RandomForest};
pub use pipeline::{InferencePipeline, Prediction};
pub use selector::{FeatureSelector, KBestSelector};
pub use tree::{DecisionTree, Node, SplitRule};

/// Custom error type for artifact loading, saving, and scoring.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write artifact file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML artifact file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize artifact to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("{stage} received a vector of width {found}, but it was trained on width {expected}.")]
    ShapeMismatch {
        stage: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error(
        "Feature schema and selector disagree at column {position}: schema has '{schema_column}', selector was fit on '{artifact_column}'."
    )]
    SchemaDrift {
        position: usize,
        schema_column: String,
        artifact_column: String,
    },
    #[error("Classifier produced a non-finite probability ({0}).")]
    NonFiniteProbability(f64),
}

/// Fails with `ShapeMismatch` unless `found == expected`.
pub(crate) fn check_width(
    stage: &'static str,
    found: usize,
    expected: usize,
) -> Result<(), ModelError> {
    if found != expected {
        return Err(ModelError::ShapeMismatch {
            stage,
            found,
            expected,
        });
    }
    Ok(())
}

pub(crate) fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let toml_string = fs::read_to_string(path)?;
    Ok(toml::from_str(&toml_string)?)
}

pub(crate) fn write_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), ModelError> {
    let toml_string = toml::to_string_pretty(value)?;
    let mut file = BufWriter::new(fs::File::create(path)?);
    file.write_all(toml_string.as_bytes())?;
    file.flush()?;
    Ok(())
}

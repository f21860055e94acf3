//! Feature selection applied to the full encoded row before classification.

use super::{ModelError, check_width, read_toml, write_toml};
use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reduces a full-width row to the columns the classifier was trained on.
///
/// Implementations are position-based: they assume the row follows the
/// training-time column order exactly.
pub trait FeatureSelector: Send + Sync {
    /// Width of the rows this selector accepts.
    fn input_width(&self) -> usize;

    /// Width of the rows this selector produces.
    fn output_width(&self) -> usize;

    /// Column names the selector was fit on, when the artifact recorded them.
    fn feature_names_in(&self) -> Option<&[String]> {
        None
    }

    fn transform(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError>;
}

/// Keeps a fixed subset of columns, chosen at training time by a univariate
/// score (the "k best" features).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KBestSelector {
    /// Number of columns in the full feature row.
    pub input_width: usize,
    /// Positions of the retained columns, strictly increasing.
    pub selected: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
}

impl KBestSelector {
    /// Checks the structural invariants of the artifact.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.selected.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "selector retains no columns".to_string(),
            ));
        }
        if let Some(&out_of_range) = self.selected.iter().find(|&&idx| idx >= self.input_width) {
            return Err(ModelError::InvalidArtifact(format!(
                "selector retains column {out_of_range}, but its input width is {}",
                self.input_width
            )));
        }
        if self.selected.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ModelError::InvalidArtifact(
                "selector column positions must be strictly increasing".to_string(),
            ));
        }
        if let Some(names) = &self.feature_names_in {
            if names.len() != self.input_width {
                return Err(ModelError::InvalidArtifact(format!(
                    "selector records {} input column names, but its input width is {}",
                    names.len(),
                    self.input_width
                )));
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let selector: Self = read_toml(path)?;
        selector.validate()?;
        log::info!(
            "Loaded feature selector from {} ({} -> {} columns)",
            path.display(),
            selector.input_width,
            selector.selected.len()
        );
        Ok(selector)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        write_toml(self, path.as_ref())
    }
}

impl FeatureSelector for KBestSelector {
    fn input_width(&self) -> usize {
        self.input_width
    }

    fn output_width(&self) -> usize {
        self.selected.len()
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn transform(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        check_width("Feature selector", row.len(), self.input_width)?;
        Ok(row.select(Axis(0), &self.selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn selector() -> KBestSelector {
        KBestSelector {
            input_width: 5,
            selected: vec![0, 2, 4],
            feature_names_in: None,
        }
    }

    #[test]
    fn test_transform_keeps_selected_positions() {
        let reduced = selector()
            .transform(array![10.0, 11.0, 12.0, 13.0, 14.0].view())
            .unwrap();
        assert_eq!(reduced, array![10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let err = selector().transform(array![1.0, 2.0, 3.0].view()).unwrap_err();
        match err {
            ModelError::ShapeMismatch {
                found, expected, ..
            } => {
                assert_eq!(found, 3);
                assert_eq!(expected, 5);
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_positions() {
        let mut out_of_range = selector();
        out_of_range.selected = vec![1, 5];
        assert!(matches!(
            out_of_range.validate(),
            Err(ModelError::InvalidArtifact(_))
        ));

        let mut unordered = selector();
        unordered.selected = vec![2, 1];
        assert!(matches!(
            unordered.validate(),
            Err(ModelError::InvalidArtifact(_))
        ));

        let mut empty = selector();
        empty.selected.clear();
        assert!(matches!(empty.validate(), Err(ModelError::InvalidArtifact(_))));

        let mut short_names = selector();
        short_names.feature_names_in = Some(vec!["a".to_string()]);
        assert!(matches!(
            short_names.validate(),
            Err(ModelError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_load_parses_toml_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        std::fs::write(
            &path,
            "input_width = 3\nselected = [0, 2]\nfeature_names_in = [\"Genero\", \"Estrato\", \"Campesino\"]\n",
        )
        .unwrap();

        let loaded = KBestSelector::load(&path).unwrap();
        assert_eq!(loaded.output_width(), 2);
        assert_eq!(
            loaded.feature_names_in().map(|names| names.len()),
            Some(3)
        );

        let copy = dir.path().join("copy.toml");
        loaded.save(&copy).unwrap();
        assert_eq!(KBestSelector::load(&copy).unwrap(), loaded);
    }
}

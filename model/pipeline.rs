//! Selector then classifier, applied to one encoded row.

use super::classifier::Classifier;
use super::selector::FeatureSelector;
use super::{ModelError, check_width};
use crate::encoder::FeatureRow;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The response shape of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of success, in `[0, 1]`.
    #[serde(rename = "probabilidad_exito")]
    pub probability: f64,
    /// Predicted class, 0 or 1.
    #[serde(rename = "prediccion")]
    pub label: u8,
}

/// Immutable chain of the loaded selector and classifier, shared across
/// concurrent requests.
#[derive(Clone)]
pub struct InferencePipeline {
    selector: Arc<dyn FeatureSelector>,
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("input_width", &self.selector.input_width())
            .field("selected_width", &self.selector.output_width())
            .field("n_features", &self.classifier.n_features())
            .finish()
    }
}

impl InferencePipeline {
    /// Chains `selector` and `classifier` after checking that both agree with
    /// `schema` and with each other. Any disagreement means the artifacts were
    /// not produced by the same training run and is reported as an error.
    pub fn new(
        schema: &FeatureSchema,
        selector: Arc<dyn FeatureSelector>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, ModelError> {
        check_width("Feature selector", schema.len(), selector.input_width())?;

        if let Some(names) = selector.feature_names_in() {
            check_width("Feature selector", schema.len(), names.len())?;
            if let Some((position, (schema_column, artifact_column))) = schema
                .columns()
                .iter()
                .zip(names)
                .enumerate()
                .find(|(_, (ours, theirs))| ours != theirs)
            {
                return Err(ModelError::SchemaDrift {
                    position,
                    schema_column: schema_column.clone(),
                    artifact_column: artifact_column.clone(),
                });
            }
        }

        check_width("Classifier", selector.output_width(), classifier.n_features())?;

        Ok(Self {
            selector,
            classifier,
        })
    }

    /// Scores one row. A width mismatch is an error, never coerced.
    pub fn infer(&self, row: &FeatureRow) -> Result<Prediction, ModelError> {
        let reduced = self.selector.transform(row.values())?;
        let probability = self.classifier.predict_proba(reduced.view())?;
        if !probability.is_finite() {
            return Err(ModelError::NonFiniteProbability(probability));
        }
        let label = self.classifier.predict(reduced.view())?;

        Ok(Prediction {
            probability: probability.clamp(0.0, 1.0),
            label,
        })
    }
}

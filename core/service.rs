//! # Prediction Service
//!
//! The thin handler in front of the core: it owns the schema-bound encoder
//! and the inference pipeline, both loaded once and shared read-only, and
//! exposes `predict(record) -> {probabilidad_exito, prediccion}`.

use crate::config::{ConfigError, ServiceConfig};
use crate::encoder::{EncoderDefaults, FeatureEncoder, FeatureRow};
use crate::model::{
    Classifier, ClassifierArtifact, FeatureSelector, InferencePipeline, KBestSelector, ModelError,
};
use crate::record::LearnerRecord;
use crate::schema::{FeatureSchema, SchemaError};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub use crate::model::Prediction;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Feature schema could not be loaded: {0}")]
    Schema(#[from] SchemaError),
    #[error("Model artifacts are unusable: {0}")]
    Model(#[from] ModelError),
    #[error("Request body is not a valid learner record: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

impl ServiceError {
    /// True when the caller sent a malformed request; every other variant is
    /// a deployment problem on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidRecord(_))
    }
}

#[derive(Debug, Clone)]
pub struct PredictionService {
    encoder: FeatureEncoder,
    pipeline: InferencePipeline,
}

impl PredictionService {
    /// Assembles a service from already loaded artifacts.
    pub fn new(
        schema: Arc<FeatureSchema>,
        selector: Arc<dyn FeatureSelector>,
        classifier: Arc<dyn Classifier>,
        defaults: EncoderDefaults,
    ) -> Result<Self, ServiceError> {
        let pipeline = InferencePipeline::new(&schema, selector, classifier)?;
        let encoder = FeatureEncoder::new(schema, defaults);
        Ok(Self { encoder, pipeline })
    }

    /// Loads every artifact named by the manifest. Any failure here means the
    /// service must not accept traffic.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let schema = Arc::new(FeatureSchema::load(&config.schema)?);
        let selector = Arc::new(KBestSelector::load(&config.selector)?);
        let classifier = Arc::new(ClassifierArtifact::load(&config.model)?);
        let service = Self::new(schema, selector, classifier, config.defaults)?;
        log::info!("Prediction service ready: {:?}", service.pipeline);
        Ok(service)
    }

    /// Reads the manifest at `path`, then loads its artifacts.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let config = ServiceConfig::load(path)?;
        Self::from_config(&config)
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    /// The full-width row the pipeline would score for `record`.
    pub fn encode(&self, record: &LearnerRecord) -> FeatureRow {
        self.encoder.encode(record)
    }

    pub fn predict(&self, record: &LearnerRecord) -> Result<Prediction, ServiceError> {
        let row = self.encoder.encode(record);
        let prediction = self.pipeline.infer(&row)?;
        log::debug!(
            "Scored record: probability {:.6}, label {}",
            prediction.probability,
            prediction.label
        );
        Ok(prediction)
    }

    /// Parses one JSON request body and scores it.
    pub fn predict_json(&self, body: &str) -> Result<Prediction, ServiceError> {
        let record: LearnerRecord = serde_json::from_str(body)?;
        self.predict(&record)
    }

    /// Scores many records in parallel. Output order follows input order; the
    /// first failure aborts the batch.
    pub fn predict_batch(&self, records: &[LearnerRecord]) -> Result<Vec<Prediction>, ServiceError> {
        let start = Instant::now();
        let predictions = records
            .par_iter()
            .map(|record| self.predict(record))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "Scored {} records in {:.2?}",
            predictions.len(),
            start.elapsed()
        );
        Ok(predictions)
    }
}

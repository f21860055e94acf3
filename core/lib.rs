#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod batch;
pub mod config;
pub mod encoder;
pub mod record;
pub mod schema;
pub mod service;

// Artifact-backed selector, classifiers and the inference pipeline.
#[path = "../model/mod.rs"]
pub mod model;

pub use encoder::{EncoderDefaults, FeatureEncoder, FeatureRow};
pub use record::LearnerRecord;
pub use schema::FeatureSchema;
pub use service::{Prediction, PredictionService};

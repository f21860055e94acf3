//! Binary classifiers scoring the reduced feature vector.
//!
//! Every classifier reports the probability of the positive (success) class
//! and a discrete label taken from its own decision rule, mirroring the
//! `predict_proba` / `predict` pair of the training toolkit.

use super::tree::{DecisionTree, Node, SplitRule};
use super::{ModelError, check_width, read_toml, write_toml};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logits beyond this magnitude saturate the sigmoid and overflow `exp`.
const LOGIT_CLAMP: f64 = 700.0;

pub trait Classifier: Send + Sync {
    /// Width of the vectors the classifier was trained on.
    fn n_features(&self) -> usize;

    /// Probability of the positive class, in `[0, 1]`.
    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError>;

    /// Discrete label in `{0, 1}`.
    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<u8, ModelError>;
}

#[inline]
fn sigmoid(logit: f64) -> f64 {
    let clamped = logit.clamp(-LOGIT_CLAMP, LOGIT_CLAMP);
    1.0 / (1.0 + f64::exp(-clamped))
}

fn validate_trees(trees: &[DecisionTree], n_features: usize) -> Result<(), ModelError> {
    if trees.is_empty() {
        return Err(ModelError::InvalidArtifact("ensemble has no trees".to_string()));
    }
    for (idx, tree) in trees.iter().enumerate() {
        tree.validate(n_features)
            .map_err(|err| ModelError::InvalidArtifact(format!("tree {idx}: {err}")))?;
    }
    Ok(())
}

/// Bagged ensemble of classification trees. Each leaf stores the fraction of
/// positive training samples that reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    #[serde(default)]
    pub split_rule: SplitRule,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_trees(&self.trees, self.n_features)?;
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            for node in &tree.nodes {
                if let Node::Leaf { value } = *node {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(ModelError::InvalidArtifact(format!(
                            "tree {tree_idx} has leaf fraction {value} outside [0, 1]"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_width("Random forest", x.len(), self.n_features)?;
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(x, self.split_rule)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    /// Argmax over the two class probabilities; a tie goes to class 0.
    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<u8, ModelError> {
        let p = self.predict_proba(x)?;
        Ok(u8::from(p > 1.0 - p))
    }
}

/// Additive ensemble of regression trees on the logit scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_features: usize,
    #[serde(default)]
    pub split_rule: SplitRule,
    /// Initial logit added before any tree.
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.base_margin.is_finite() {
            return Err(ModelError::InvalidArtifact(
                "base_margin must be finite".to_string(),
            ));
        }
        validate_trees(&self.trees, self.n_features)
    }

    fn margin(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_width("Gradient boosting model", x.len(), self.n_features)?;
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.evaluate(x, self.split_rule)?;
        }
        Ok(margin)
    }
}

impl Classifier for GradientBoosting {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        Ok(sigmoid(self.margin(x)?))
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<u8, ModelError> {
        Ok(u8::from(self.predict_proba(x)? > 0.5))
    }
}

/// Linear logistic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "logistic model has no coefficients".to_string(),
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::InvalidArtifact(
                "logistic model weights must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn decision_function(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_width("Logistic model", x.len(), self.coefficients.len())?;
        let weights = ArrayView1::from(self.coefficients.as_slice());
        Ok(weights.dot(&x) + self.intercept)
    }
}

impl Classifier for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        Ok(sigmoid(self.decision_function(x)?))
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<u8, ModelError> {
        Ok(u8::from(self.decision_function(x)? > 0.0))
    }
}

/// The persisted classifier, tagged by `kind` in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Logistic(LogisticModel),
}

impl ClassifierArtifact {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::RandomForest(model) => model.validate(),
            Self::GradientBoosting(model) => model.validate(),
            Self::Logistic(model) => model.validate(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random forest",
            Self::GradientBoosting(_) => "gradient boosting",
            Self::Logistic(_) => "logistic",
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::RandomForest(model) => model,
            Self::GradientBoosting(model) => model,
            Self::Logistic(model) => model,
        }
    }

    /// Loads and validates a classifier artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let model: Self = read_toml(path)?;
        model.validate()?;
        log::info!(
            "Loaded {} classifier from {} ({} features)",
            model.kind(),
            path.display(),
            model.n_features()
        );
        Ok(model)
    }

    /// Saves the classifier in a human-readable TOML format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        write_toml(self, path.as_ref())
    }
}

impl Classifier for ClassifierArtifact {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        self.inner().predict_proba(x)
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<u8, ModelError> {
        self.inner().predict(x)
    }
}

//! Decision trees shared by the tree-ensemble classifiers.
//!
//! Nodes are stored in a flat array with the root at index 0. Every split
//! points at children stored after it, so traversal always terminates.

use super::ModelError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Comparison that sends a sample to the left child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Go left if `value <= threshold`.
    #[default]
    LessOrEqual,
    /// Go left if `value < threshold`.
    Less,
}

impl SplitRule {
    /// NaN never satisfies either comparison and goes right.
    #[inline]
    pub fn go_left(self, value: f64, threshold: f64) -> bool {
        match self {
            SplitRule::LessOrEqual => value <= threshold,
            SplitRule::Less => value < threshold,
        }
    }
}

/// A node in a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal split node.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf node. Its meaning (class fraction or margin) is up to the ensemble.
    Leaf { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Checks that the tree is non-empty, its children are in range and stored
    /// after their parent, and every split reads a feature `< n_features`.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidArtifact("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(ModelError::InvalidArtifact(format!(
                            "node {idx} splits on feature {feature}, but the model has {n_features} features"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::InvalidArtifact(format!(
                            "node {idx} has a NaN threshold"
                        )));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ModelError::InvalidArtifact(format!(
                                "node {idx} points at child {child}, which is not a later node of a {}-node tree",
                                self.nodes.len()
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ModelError::InvalidArtifact(format!(
                            "leaf {idx} holds a non-finite value"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks the tree for one sample and returns the leaf value reached.
    pub fn evaluate(&self, x: ArrayView1<'_, f64>, rule: SplitRule) -> Result<f64, ModelError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(&Node::Leaf { value }) => return Ok(value),
                Some(&Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = *x.get(feature).ok_or_else(|| {
                        ModelError::InvalidArtifact(format!(
                            "node {idx} reads feature {feature} of a {}-wide vector",
                            x.len()
                        ))
                    })?;
                    let next = if rule.go_left(value, threshold) { left } else { right };
                    if next <= idx {
                        return Err(ModelError::InvalidArtifact(format!(
                            "node {idx} points back at node {next}"
                        )));
                    }
                    idx = next;
                }
                None => {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tree has no node {idx}"
                    )));
                }
            }
        }
    }
}

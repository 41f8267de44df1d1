//! Per-model classification output.

use crate::core::ERROR_LABEL;
use crate::utils::argmax;
use serde::{Deserialize, Serialize};

/// Probability assigned to one class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    /// Class label as declared by the model descriptor.
    pub label: String,
    /// Probability in `[0, 1]`.
    pub probability: f32,
}

/// What one model said about the image.
///
/// A failed call is represented by the sentinel returned from
/// [`ModelOutput::sentinel`]: top label `"error"`, probability `0.0`, no class
/// probabilities, and the failure text in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Disease key of the producing model.
    pub disease_key: String,
    /// Class probabilities in descriptor label order.
    pub class_probabilities: Vec<ClassProbability>,
    /// Label with the highest probability (first on ties).
    pub top_label: String,
    /// Probability of `top_label`.
    pub top_probability: f32,
    /// Failure description, only set on the sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelOutput {
    /// Builds an output from probabilities aligned with `labels`.
    ///
    /// The caller guarantees `labels.len() == probabilities.len()` and that the
    /// vector is non-empty.
    pub fn from_probabilities(disease_key: &str, labels: &[String], probabilities: &[f32]) -> Self {
        let top = argmax(probabilities).unwrap_or(0);

        let class_probabilities = labels
            .iter()
            .zip(probabilities)
            .map(|(label, &probability)| ClassProbability {
                label: label.clone(),
                probability,
            })
            .collect();

        Self {
            disease_key: disease_key.to_string(),
            class_probabilities,
            top_label: labels.get(top).cloned().unwrap_or_default(),
            top_probability: probabilities.get(top).copied().unwrap_or(0.0),
            error: None,
        }
    }

    /// The error sentinel for a failed call.
    pub fn sentinel(disease_key: &str, error: impl Into<String>) -> Self {
        Self {
            disease_key: disease_key.to_string(),
            class_probabilities: Vec::new(),
            top_label: ERROR_LABEL.to_string(),
            top_probability: 0.0,
            error: Some(error.into()),
        }
    }

    /// Whether this output is the error sentinel.
    pub fn is_error(&self) -> bool {
        self.top_label == ERROR_LABEL && self.class_probabilities.is_empty()
    }

    /// Probability of `label`, or `0.0` if the model has no such class.
    pub fn probability_of(&self, label: &str) -> f32 {
        self.class_probabilities
            .iter()
            .find(|c| c.label == label)
            .map_or(0.0, |c| c.probability)
    }

    /// Highest probability among classes other than `negative_label`.
    pub fn max_positive_probability(&self, negative_label: &str) -> f32 {
        self.class_probabilities
            .iter()
            .filter(|c| c.label != negative_label)
            .map(|c| c.probability)
            .fold(0.0, f32::max)
    }
}

//! The reconciled diagnosis across all registered models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one model contributed to the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// The model's top label is a disease class.
    Positive,
    /// The model's top label is its negative class.
    Negative,
    /// The model call failed; counted as negative with probability 0.
    Unavailable,
}

/// Per-model line of the diagnosis breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFinding {
    /// Disease key of the model.
    pub disease_key: String,
    /// Model top label (`"error"` for an unavailable model).
    pub label: String,
    /// Disease-qualified label when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_label: Option<String>,
    /// Probability of the model's top label.
    pub probability: f32,
    /// Accuracy reported for the model at registration.
    pub reported_accuracy: f64,
    /// Contribution status.
    pub status: FindingStatus,
    /// Failure text for unavailable models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One primary diagnosis with its confidence and the full breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDiagnosis {
    /// `"normal"` or a disease-qualified label.
    pub primary_diagnosis: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Disease key to that model's top label.
    pub all_predictions: BTreeMap<String, String>,
    /// Disease key to that model's highest non-negative class probability.
    pub confidence_scores: BTreeMap<String, f32>,
    /// Advisory quality score in `[0, 100]`.
    pub image_quality: f64,
    /// One finding per model, in registration order.
    pub findings: Vec<ModelFinding>,
    /// Disease keys of every positive model, best ranked first.
    pub significant_findings: Vec<String>,
    /// Whether more than one model fired.
    pub multiple_findings: bool,
}

impl AggregatedDiagnosis {
    /// Whether no model fired.
    pub fn is_normal(&self) -> bool {
        self.significant_findings.is_empty()
    }

    /// Number of models whose call failed.
    pub fn unavailable_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.status == FindingStatus::Unavailable)
            .count()
    }

    /// Findings that fired, other than the primary one.
    pub fn secondary_findings(&self) -> impl Iterator<Item = &ModelFinding> {
        self.findings.iter().filter(move |f| {
            f.status == FindingStatus::Positive
                && f.qualified_label.as_deref() != Some(self.primary_diagnosis.as_str())
        })
    }
}

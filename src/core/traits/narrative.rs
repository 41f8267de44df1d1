//! The external narrative generation capability.

use crate::core::TriageError;
use crate::domain::Urgency;
use serde::{Deserialize, Serialize};

/// What the generator is asked to write about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    /// `"normal"` or a disease-qualified label.
    pub primary_diagnosis: String,
    /// Display name of the diagnosis.
    pub condition_name: String,
    /// Diagnosis confidence in `[0, 1]`.
    pub confidence: f32,
    /// Urgency band already decided for the report.
    pub urgency: Urgency,
    /// Display names of other positive findings.
    pub additional_findings: Vec<String>,
    /// Advisory quality score in `[0, 100]`.
    pub image_quality: f64,
}

/// Narrative text of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    /// One-line headline.
    pub summary: String,
    /// Description of the finding.
    pub description: String,
    /// Suggested next step.
    pub recommendation: String,
}

impl Narrative {
    /// Whether any field is blank.
    pub fn has_empty_field(&self) -> bool {
        [&self.summary, &self.description, &self.recommendation]
            .iter()
            .any(|s| s.trim().is_empty())
    }
}

/// A natural-language generation service.
///
/// Calls may block; the report synthesizer bounds them with its own deadline
/// and treats any error as a reason to fall back to the template.
pub trait NarrativeGenerator: Send + Sync {
    /// Produces the narrative for one diagnosis.
    fn generate(&self, request: &NarrativeRequest) -> Result<Narrative, TriageError>;
}

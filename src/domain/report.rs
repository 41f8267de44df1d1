//! Structured medical report attached to a diagnosis.

use serde::{Deserialize, Serialize};

/// Urgency band derived from the diagnosis confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    /// Routine follow-up.
    Low,
    /// Medical review recommended.
    Medium,
    /// Prompt consultation recommended.
    High,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Low => write!(f, "Low"),
            Urgency::Medium => write!(f, "Medium"),
            Urgency::High => write!(f, "High"),
        }
    }
}

/// Which path produced the narrative text of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSource {
    /// Narrative produced by the external generation service.
    #[serde(rename = "generated")]
    Generated,
    /// Narrative assembled from the static knowledge table.
    #[serde(rename = "template-fallback")]
    TemplateFallback,
}

/// One staged severity description, e.g. `("stage_1", "Early stage, confined to lung")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityLevel {
    /// Stage key.
    pub stage: String,
    /// Human-readable description.
    pub description: String,
}

/// The report handed back with every diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalReport {
    /// One-line headline.
    pub summary: String,
    /// Description of the finding.
    pub description: String,
    /// Suggested next step.
    pub recommendation: String,
    /// Confidence band.
    pub urgency: Urgency,
    /// Typical symptoms of the condition.
    pub symptoms: Vec<String>,
    /// Usual causes or risk factors.
    pub causes: Vec<String>,
    /// Treatment options.
    pub treatments: Vec<String>,
    /// Prevention measures.
    pub prevention: Vec<String>,
    /// Staged severity descriptions, mildest first.
    pub severity_levels: Vec<SeverityLevel>,
    /// Set when the image quality is below the configured threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_note: Option<String>,
    /// Which narrative path was taken.
    pub source: ReportSource,
    /// Why the template path was taken, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&ReportSource::TemplateFallback).unwrap(),
            "\"template-fallback\""
        );
        assert_eq!(
            serde_json::to_string(&ReportSource::Generated).unwrap(),
            "\"generated\""
        );
    }

    #[test]
    fn test_urgency_orders_by_severity() {
        assert!(Urgency::High > Urgency::Medium);
        assert!(Urgency::Medium > Urgency::Low);
        assert_eq!(Urgency::Medium.to_string(), "Medium");
    }
}

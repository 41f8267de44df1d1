//! Deterministic report text assembled from the knowledge table.

use crate::core::config::ReportConfig;
use crate::core::traits::Narrative;
use crate::domain::{AggregatedDiagnosis, DiseaseKnowledge, Urgency, display_name, knowledge_for};

const TITLE: &str = "Medical Image Analysis Report";

/// Quality note attached to reports for low quality uploads.
pub const LOW_QUALITY_NOTE: &str =
    "Image quality is suboptimal. Consider retaking with better lighting/positioning.";

/// Urgency band of a diagnosis.
///
/// A normal diagnosis is always `Low`. Otherwise the confidence is compared
/// against the configured bands; the number of findings does not change it.
pub fn urgency_for(diagnosis: &AggregatedDiagnosis, config: &ReportConfig) -> Urgency {
    if diagnosis.is_normal() {
        return Urgency::Low;
    }
    let confidence = f64::from(diagnosis.confidence);
    if confidence >= config.high_urgency_threshold {
        Urgency::High
    } else if confidence >= config.medium_urgency_threshold {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Knowledge entry describing the primary diagnosis.
pub fn knowledge_of(diagnosis: &AggregatedDiagnosis) -> &'static DiseaseKnowledge {
    knowledge_for(
        &diagnosis.primary_diagnosis,
        diagnosis.significant_findings.first().map(String::as_str),
    )
}

/// Display names of the positive findings other than the primary one, with
/// their probabilities.
pub(crate) fn additional_findings(diagnosis: &AggregatedDiagnosis) -> Vec<(String, f32)> {
    diagnosis
        .secondary_findings()
        .map(|f| {
            let label = f.qualified_label.as_deref().unwrap_or(f.label.as_str());
            (display_name(label), f.probability)
        })
        .collect()
}

fn percent(value: f32) -> String {
    format!("{:.1}%", f64::from(value) * 100.0)
}

fn band_recommendation(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::High => "High confidence prediction. Recommend immediate medical consultation.",
        Urgency::Medium => "Moderate confidence prediction. Recommend medical review.",
        Urgency::Low => "Low confidence prediction. Additional testing recommended.",
    }
}

/// Builds the template narrative for a diagnosis.
pub fn template_narrative(diagnosis: &AggregatedDiagnosis, urgency: Urgency) -> Narrative {
    let knowledge = knowledge_of(diagnosis);

    if diagnosis.is_normal() {
        let mut description = knowledge.description.to_string();
        let unavailable = diagnosis.unavailable_count();
        if unavailable > 0 {
            description.push_str(&format!(
                " {unavailable} of {} models could not be evaluated.",
                diagnosis.findings.len()
            ));
        }
        return Narrative {
            summary: format!("{TITLE} - Normal Finding"),
            description,
            recommendation: "Chest X-ray appears normal. Continue regular health monitoring."
                .to_string(),
        };
    }

    let primary = display_name(&diagnosis.primary_diagnosis);
    let others = additional_findings(diagnosis);

    let summary = if others.is_empty() {
        format!("{TITLE} - {primary} Detected")
    } else {
        let names: Vec<&str> = std::iter::once(primary.as_str())
            .chain(others.iter().map(|(name, _)| name.as_str()))
            .collect();
        format!("{TITLE} - Multiple Findings: {}", names.join(", "))
    };

    let mut description = format!(
        "{}. Detected with {} confidence.",
        knowledge.description.trim_end_matches('.'),
        percent(diagnosis.confidence)
    );
    if !others.is_empty() {
        let listed: Vec<String> = others
            .iter()
            .map(|(name, p)| format!("{name} ({})", percent(*p)))
            .collect();
        description.push_str(&format!(" Additional findings: {}.", listed.join(", ")));
    }

    let mut recommendation = band_recommendation(urgency).to_string();
    if !others.is_empty() {
        recommendation.push_str(&format!(
            " Multiple significant findings detected ({} conditions). Comprehensive medical evaluation recommended.",
            others.len() + 1
        ));
    }

    Narrative {
        summary,
        description,
        recommendation,
    }
}

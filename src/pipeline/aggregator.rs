//! The diagnosis aggregator stage.
//!
//! Reduces the per-model outputs to one primary diagnosis. This stage never
//! fails: error sentinels count as negative findings with probability zero.

use crate::core::constants::NORMAL_DIAGNOSIS;
use crate::core::registry::{ModelDescriptor, ModelRegistry};
use crate::domain::{AggregatedDiagnosis, FindingStatus, ModelFinding, ModelOutput};
use std::collections::BTreeMap;
use tracing::debug;

fn finding(descriptor: &ModelDescriptor, output: &ModelOutput) -> ModelFinding {
    let status = if output.is_error() {
        FindingStatus::Unavailable
    } else if descriptor.is_positive_label(&output.top_label) {
        FindingStatus::Positive
    } else {
        FindingStatus::Negative
    };
    ModelFinding {
        disease_key: descriptor.disease_key.clone(),
        label: output.top_label.clone(),
        qualified_label: (status == FindingStatus::Positive)
            .then(|| descriptor.qualified_label(&output.top_label)),
        probability: output.top_probability,
        reported_accuracy: descriptor.reported_accuracy,
        status,
        error: output.error.clone(),
    }
}

/// Aggregates model outputs into an [`AggregatedDiagnosis`].
///
/// `outputs` is matched to the registry by disease key; a registered model
/// with no output is treated as unavailable.
///
/// * No positive model: the diagnosis is `"normal"` and the confidence is the
///   smallest negative-class probability across models.
/// * One positive model: its qualified label and top probability.
/// * Several: the model with the highest reported accuracy wins, the earliest
///   registered on an exact tie.
pub fn aggregate(
    registry: &ModelRegistry,
    outputs: &[ModelOutput],
    image_quality: f64,
) -> AggregatedDiagnosis {
    let mut findings = Vec::with_capacity(registry.len());
    let mut all_predictions = BTreeMap::new();
    let mut confidence_scores = BTreeMap::new();
    let mut negative_floor: Option<f32> = None;

    for descriptor in registry.all() {
        let key = descriptor.disease_key.as_str();
        let output = outputs
            .iter()
            .find(|o| o.disease_key == key)
            .cloned()
            .unwrap_or_else(|| ModelOutput::sentinel(key, "no output produced"));

        let negative = if output.is_error() {
            0.0
        } else {
            output.probability_of(&descriptor.negative_label)
        };
        negative_floor = Some(negative_floor.map_or(negative, |m| m.min(negative)));

        all_predictions.insert(key.to_string(), output.top_label.clone());
        confidence_scores.insert(
            key.to_string(),
            output.max_positive_probability(&descriptor.negative_label),
        );
        findings.push(finding(descriptor, &output));
    }

    // Rank positives: accuracy descending, registration order among equals.
    let mut ranked: Vec<&ModelFinding> = findings
        .iter()
        .filter(|f| f.status == FindingStatus::Positive)
        .collect();
    ranked.sort_by(|a, b| b.reported_accuracy.total_cmp(&a.reported_accuracy));

    let (primary_diagnosis, confidence) = match ranked.first() {
        Some(winner) => (
            winner
                .qualified_label
                .clone()
                .unwrap_or_else(|| winner.label.clone()),
            winner.probability,
        ),
        None => (NORMAL_DIAGNOSIS.to_string(), negative_floor.unwrap_or(0.0)),
    };
    let significant_findings: Vec<String> =
        ranked.iter().map(|f| f.disease_key.clone()).collect();
    let multiple_findings = significant_findings.len() > 1;

    debug!(
        %primary_diagnosis,
        confidence,
        positives = significant_findings.len(),
        "aggregated diagnosis"
    );

    AggregatedDiagnosis {
        primary_diagnosis,
        confidence,
        all_predictions,
        confidence_scores,
        image_quality,
        findings,
        significant_findings,
        multiple_findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::standard_descriptors;
    use crate::core::TriageError;
    use crate::domain::ImageTensor;

    fn unused(_: &ImageTensor) -> Result<Vec<f32>, TriageError> {
        Ok(Vec::new())
    }

    fn registry(descriptors: Vec<ModelDescriptor>) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        for descriptor in descriptors {
            registry.register(descriptor, unused).unwrap();
        }
        registry
    }

    fn output(descriptor: &ModelDescriptor, probabilities: &[f32]) -> ModelOutput {
        ModelOutput::from_probabilities(&descriptor.disease_key, &descriptor.class_labels, probabilities)
    }

    fn standard_outputs(pneumonia: &[f32], tb: &[f32], cancer: &[f32]) -> (ModelRegistry, Vec<ModelOutput>) {
        let descriptors = standard_descriptors();
        let outputs = vec![
            output(&descriptors[0], pneumonia),
            output(&descriptors[1], tb),
            output(&descriptors[2], cancer),
        ];
        (registry(descriptors), outputs)
    }

    #[test]
    fn test_all_negative_uses_minimum_negative_probability() {
        let (registry, outputs) =
            standard_outputs(&[0.91, 0.09], &[0.88, 0.12], &[0.97, 0.02, 0.01]);
        let diagnosis = aggregate(&registry, &outputs, 72.0);

        assert_eq!(diagnosis.primary_diagnosis, "normal");
        assert!((diagnosis.confidence - 0.88).abs() < 1e-6);
        assert!(diagnosis.is_normal());
        assert!(!diagnosis.multiple_findings);
        assert_eq!(diagnosis.all_predictions["lung_cancer"], "normal");
        assert!((diagnosis.confidence_scores["lung_cancer"] - 0.02).abs() < 1e-6);
        assert_eq!(diagnosis.image_quality, 72.0);
    }

    #[test]
    fn test_single_positive_wins_with_its_probability() {
        let (registry, outputs) =
            standard_outputs(&[0.13, 0.87], &[0.88, 0.12], &[0.97, 0.02, 0.01]);
        let diagnosis = aggregate(&registry, &outputs, 80.0);

        assert_eq!(diagnosis.primary_diagnosis, "pneumonia");
        assert!((diagnosis.confidence - 0.87).abs() < 1e-6);
        assert_eq!(diagnosis.significant_findings, vec!["pneumonia"]);
        assert_eq!(diagnosis.findings[0].status, FindingStatus::Positive);
        assert_eq!(diagnosis.findings[1].status, FindingStatus::Negative);
    }

    #[test]
    fn test_qualified_label_for_multiclass_model() {
        let (registry, outputs) =
            standard_outputs(&[0.9, 0.1], &[0.9, 0.1], &[0.2, 0.1, 0.7]);
        let diagnosis = aggregate(&registry, &outputs, 80.0);

        assert_eq!(diagnosis.primary_diagnosis, "lung_cancer_malignant");
        assert_eq!(diagnosis.all_predictions["lung_cancer"], "malignant");
        assert!((diagnosis.confidence_scores["lung_cancer"] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_several_positives_resolved_by_reported_accuracy() {
        let (registry, outputs) =
            standard_outputs(&[0.35, 0.65], &[0.2, 0.8], &[0.97, 0.02, 0.01]);
        let diagnosis = aggregate(&registry, &outputs, 80.0);

        // pneumonia (0.942) outranks tuberculosis (0.918) despite the lower probability.
        assert_eq!(diagnosis.primary_diagnosis, "pneumonia");
        assert!((diagnosis.confidence - 0.65).abs() < 1e-6);
        assert!(diagnosis.multiple_findings);
        assert_eq!(diagnosis.significant_findings, vec!["pneumonia", "tuberculosis"]);
        let secondary: Vec<_> = diagnosis.secondary_findings().map(|f| f.disease_key.as_str()).collect();
        assert_eq!(secondary, vec!["tuberculosis"]);
    }

    #[test]
    fn test_later_model_with_higher_accuracy_wins() {
        let mut descriptors = standard_descriptors();
        descriptors.truncate(2);
        descriptors[1].reported_accuracy = 0.95;
        let outputs = vec![
            output(&descriptors[0], &[0.1, 0.9]),
            output(&descriptors[1], &[0.4, 0.6]),
        ];
        let diagnosis = aggregate(&registry(descriptors), &outputs, 80.0);

        assert_eq!(diagnosis.primary_diagnosis, "tuberculosis");
        assert!((diagnosis.confidence - 0.6).abs() < 1e-6);
        assert_eq!(diagnosis.significant_findings, vec!["tuberculosis", "pneumonia"]);
    }

    #[test]
    fn test_accuracy_tie_goes_to_earliest_registered() {
        let descriptors = vec![
            ModelDescriptor::new("edema", ["normal", "edema"], 0.9),
            ModelDescriptor::new("effusion", ["normal", "effusion"], 0.9),
        ];
        let outputs = vec![
            output(&descriptors[0], &[0.4, 0.6]),
            output(&descriptors[1], &[0.05, 0.95]),
        ];
        let registry = registry(descriptors);
        let diagnosis = aggregate(&registry, &outputs, 80.0);
        assert_eq!(diagnosis.primary_diagnosis, "edema");

        // Output order does not matter, only registration order.
        let reversed: Vec<_> = outputs.into_iter().rev().collect();
        assert_eq!(aggregate(&registry, &reversed, 80.0).primary_diagnosis, "edema");
    }

    #[test]
    fn test_all_error_outputs_are_normal_with_zero_confidence() {
        let descriptors = standard_descriptors();
        let outputs: Vec<_> = descriptors
            .iter()
            .map(|d| ModelOutput::sentinel(&d.disease_key, "runtime failure"))
            .collect();
        let diagnosis = aggregate(&registry(descriptors), &outputs, 80.0);

        assert_eq!(diagnosis.primary_diagnosis, "normal");
        assert_eq!(diagnosis.confidence, 0.0);
        assert_eq!(diagnosis.unavailable_count(), 3);
        assert_eq!(diagnosis.all_predictions["pneumonia"], "error");
        assert_eq!(diagnosis.confidence_scores["pneumonia"], 0.0);
        assert_eq!(diagnosis.findings[0].error.as_deref(), Some("runtime failure"));
    }

    #[test]
    fn test_one_error_pulls_normal_confidence_to_zero() {
        let descriptors = standard_descriptors();
        let outputs = vec![
            output(&descriptors[0], &[0.91, 0.09]),
            ModelOutput::sentinel("tuberculosis", "timed out"),
            output(&descriptors[2], &[0.97, 0.02, 0.01]),
        ];
        let diagnosis = aggregate(&registry(descriptors), &outputs, 80.0);
        assert_eq!(diagnosis.primary_diagnosis, "normal");
        assert_eq!(diagnosis.confidence, 0.0);
    }

    #[test]
    fn test_missing_output_is_unavailable() {
        let descriptors = standard_descriptors();
        let outputs = vec![output(&descriptors[0], &[0.2, 0.8])];
        let diagnosis = aggregate(&registry(descriptors), &outputs, 80.0);
        assert_eq!(diagnosis.primary_diagnosis, "pneumonia");
        assert_eq!(diagnosis.unavailable_count(), 2);
        assert_eq!(diagnosis.all_predictions.len(), 3);
    }

    #[test]
    fn test_empty_registry() {
        let diagnosis = aggregate(&ModelRegistry::new(), &[], 80.0);
        assert_eq!(diagnosis.primary_diagnosis, "normal");
        assert_eq!(diagnosis.confidence, 0.0);
        assert!(diagnosis.findings.is_empty());
    }
}

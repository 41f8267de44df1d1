//! The report synthesizer stage.

use super::template::{LOW_QUALITY_NOTE, additional_findings, knowledge_of, template_narrative, urgency_for};
use crate::core::config::ReportConfig;
use crate::core::traits::{Narrative, NarrativeGenerator, NarrativeRequest};
use crate::core::TriageError;
use crate::domain::{AggregatedDiagnosis, MedicalReport, ReportSource, Urgency, display_name};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of asking the generator for a narrative.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    /// The generator produced a usable narrative.
    Generated(Narrative),
    /// The template path must be used.
    Fallback {
        /// Why generation was not used.
        reason: String,
    },
}

/// Builds the [`MedicalReport`] for a diagnosis.
///
/// Never fails. Generation is attempted at most twice, each call bounded by
/// `generation.timeout_ms`; any failure yields the template narrative.
#[derive(Clone)]
pub struct ReportSynthesizer {
    config: ReportConfig,
    generator: Option<Arc<dyn NarrativeGenerator>>,
}

impl std::fmt::Debug for ReportSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSynthesizer")
            .field("config", &self.config)
            .field("has_generator", &self.generator.is_some())
            .finish()
    }
}

impl Default for ReportSynthesizer {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

impl ReportSynthesizer {
    /// Creates a template-only synthesizer with clamped thresholds.
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config: config.clamped(),
            generator: None,
        }
    }

    /// Tries `generator` before falling back to the template.
    pub fn with_generator(mut self, generator: Arc<dyn NarrativeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// The active report configuration.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Urgency band of `diagnosis` under this synthesizer's thresholds.
    pub fn urgency(&self, diagnosis: &AggregatedDiagnosis) -> Urgency {
        urgency_for(diagnosis, &self.config)
    }

    fn request_for(diagnosis: &AggregatedDiagnosis, urgency: Urgency) -> NarrativeRequest {
        NarrativeRequest {
            primary_diagnosis: diagnosis.primary_diagnosis.clone(),
            condition_name: display_name(&diagnosis.primary_diagnosis),
            confidence: diagnosis.confidence,
            urgency,
            additional_findings: additional_findings(diagnosis)
                .into_iter()
                .map(|(name, _)| name)
                .collect(),
            image_quality: diagnosis.image_quality,
        }
    }

    fn call_bounded(
        generator: Arc<dyn NarrativeGenerator>,
        request: NarrativeRequest,
        timeout: Duration,
    ) -> Result<Narrative, TriageError> {
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("triage-narrative".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| generator.generate(&request)));
                let _ = tx.send(result);
            })
            .map_err(|e| TriageError::report_unavailable(format!("cannot start generation worker: {e}")))?;

        match rx.recv_timeout(timeout) {
            Ok(Ok(Ok(narrative))) if narrative.has_empty_field() => Err(
                TriageError::report_unavailable("generator returned an empty field"),
            ),
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TriageError::report_unavailable("generator panicked")),
            Err(RecvTimeoutError::Timeout) => Err(TriageError::report_unavailable(format!(
                "generation timed out after {} ms",
                timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(TriageError::report_unavailable(
                "generation worker exited without a result",
            )),
        }
    }

    /// Asks the generator for a narrative, retrying once.
    pub fn narrate(&self, request: &NarrativeRequest) -> NarrativeOutcome {
        let generation = &self.config.generation;
        if !generation.enabled {
            return NarrativeOutcome::Fallback {
                reason: "narrative generation disabled".to_string(),
            };
        }
        let Some(generator) = &self.generator else {
            return NarrativeOutcome::Fallback {
                reason: "no narrative generator configured".to_string(),
            };
        };

        let timeout = Duration::from_millis(generation.timeout_ms);
        let mut last_error = String::new();
        for attempt in 1..=2 {
            match Self::call_bounded(generator.clone(), request.clone(), timeout) {
                Ok(narrative) => return NarrativeOutcome::Generated(narrative),
                Err(e) => {
                    warn!(attempt, error = %e, "narrative generation failed");
                    last_error = e.to_string();
                    if attempt == 1 {
                        thread::sleep(Duration::from_millis(generation.retry_backoff_ms));
                    }
                }
            }
        }
        NarrativeOutcome::Fallback { reason: last_error }
    }

    /// Builds the report for `diagnosis`.
    pub fn synthesize(&self, diagnosis: &AggregatedDiagnosis) -> MedicalReport {
        let urgency = self.urgency(diagnosis);
        let knowledge = knowledge_of(diagnosis);

        let request = Self::request_for(diagnosis, urgency);
        let (narrative, source, fallback_reason) = match self.narrate(&request) {
            NarrativeOutcome::Generated(narrative) => (narrative, ReportSource::Generated, None),
            NarrativeOutcome::Fallback { reason } => {
                debug!(%reason, "using template narrative");
                (
                    template_narrative(diagnosis, urgency),
                    ReportSource::TemplateFallback,
                    Some(reason),
                )
            }
        };

        let quality_note = (diagnosis.image_quality < self.config.low_quality_threshold)
            .then(|| LOW_QUALITY_NOTE.to_string());

        MedicalReport {
            summary: narrative.summary,
            description: narrative.description,
            recommendation: narrative.recommendation,
            urgency,
            symptoms: knowledge.symptom_list(),
            causes: knowledge.cause_list(),
            treatments: knowledge.treatment_list(),
            prevention: knowledge.prevention_list(),
            severity_levels: knowledge.severity(),
            quality_note,
            source,
            fallback_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GenerationConfig;
    use crate::domain::{FindingStatus, ModelFinding};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGenerator {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
        narrative: Narrative,
    }

    impl ScriptedGenerator {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                delay: Duration::ZERO,
                narrative: Narrative {
                    summary: "Generated summary".to_string(),
                    description: "Generated description".to_string(),
                    recommendation: "Generated recommendation".to_string(),
                },
            }
        }
    }

    impl NarrativeGenerator for ScriptedGenerator {
        fn generate(&self, _: &NarrativeRequest) -> Result<Narrative, TriageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if call < self.fail_first {
                return Err(TriageError::report_unavailable("service unavailable"));
            }
            Ok(self.narrative.clone())
        }
    }

    fn enabled() -> ReportConfig {
        ReportConfig::default().with_generation(
            GenerationConfig::default()
                .with_enabled(true)
                .with_timeout_ms(200)
                .with_retry_backoff_ms(10),
        )
    }

    fn pneumonia(confidence: f32, quality: f64) -> AggregatedDiagnosis {
        AggregatedDiagnosis {
            primary_diagnosis: "pneumonia".to_string(),
            confidence,
            all_predictions: BTreeMap::from([("pneumonia".to_string(), "pneumonia".to_string())]),
            confidence_scores: BTreeMap::from([("pneumonia".to_string(), confidence)]),
            image_quality: quality,
            findings: vec![ModelFinding {
                disease_key: "pneumonia".to_string(),
                label: "pneumonia".to_string(),
                qualified_label: Some("pneumonia".to_string()),
                probability: confidence,
                reported_accuracy: 0.942,
                status: FindingStatus::Positive,
                error: None,
            }],
            significant_findings: vec!["pneumonia".to_string()],
            multiple_findings: false,
        }
    }

    #[test]
    fn test_disabled_generation_uses_template() {
        let report = ReportSynthesizer::default().synthesize(&pneumonia(0.87, 80.0));
        assert_eq!(report.source, ReportSource::TemplateFallback);
        assert_eq!(report.fallback_reason.as_deref(), Some("narrative generation disabled"));
        assert_eq!(report.urgency, Urgency::High);
        assert_eq!(report.summary, "Medical Image Analysis Report - Pneumonia Detected");
        assert!(!report.symptoms.is_empty());
        assert!(!report.treatments.is_empty());
        assert!(report.quality_note.is_none());
    }

    #[test]
    fn test_generated_narrative_is_used() {
        let generator = Arc::new(ScriptedGenerator::new(0));
        let synthesizer = ReportSynthesizer::new(enabled()).with_generator(generator.clone());
        let report = synthesizer.synthesize(&pneumonia(0.65, 80.0));
        assert_eq!(report.source, ReportSource::Generated);
        assert_eq!(report.summary, "Generated summary");
        assert_eq!(report.urgency, Urgency::Medium);
        assert!(report.fallback_reason.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_one_failure_is_retried() {
        let generator = Arc::new(ScriptedGenerator::new(1));
        let synthesizer = ReportSynthesizer::new(enabled()).with_generator(generator.clone());
        let report = synthesizer.synthesize(&pneumonia(0.87, 80.0));
        assert_eq!(report.source, ReportSource::Generated);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_persistent_failure_falls_back_with_band_urgency() {
        let generator = Arc::new(ScriptedGenerator::new(usize::MAX));
        let synthesizer = ReportSynthesizer::new(enabled()).with_generator(generator.clone());
        let report = synthesizer.synthesize(&pneumonia(0.87, 80.0));
        assert_eq!(report.source, ReportSource::TemplateFallback);
        assert_eq!(report.urgency, Urgency::High);
        assert!(report.recommendation.starts_with("High confidence prediction."));
        assert!(report.fallback_reason.unwrap().contains("service unavailable"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_slow_generator_is_abandoned() {
        let mut slow = ScriptedGenerator::new(0);
        slow.delay = Duration::from_millis(2_000);
        let synthesizer = ReportSynthesizer::new(enabled()).with_generator(Arc::new(slow));

        let started = std::time::Instant::now();
        let report = synthesizer.synthesize(&pneumonia(0.87, 80.0));
        assert!(started.elapsed() < Duration::from_millis(1_500));
        assert_eq!(report.source, ReportSource::TemplateFallback);
        assert!(report.fallback_reason.unwrap().contains("timed out"));
    }

    #[test]
    fn test_empty_narrative_falls_back() {
        let mut blank = ScriptedGenerator::new(0);
        blank.narrative.description = "   ".to_string();
        let synthesizer = ReportSynthesizer::new(enabled()).with_generator(Arc::new(blank));
        let report = synthesizer.synthesize(&pneumonia(0.87, 80.0));
        assert_eq!(report.source, ReportSource::TemplateFallback);
        assert!(!report.description.trim().is_empty());
    }

    #[test]
    fn test_low_quality_adds_note() {
        let report = ReportSynthesizer::default().synthesize(&pneumonia(0.42, 31.5));
        assert_eq!(report.urgency, Urgency::Low);
        assert_eq!(report.quality_note.as_deref(), Some(LOW_QUALITY_NOTE));
    }

    #[test]
    fn test_normal_diagnosis_is_low_urgency() {
        let mut normal = pneumonia(0.95, 80.0);
        normal.primary_diagnosis = "normal".to_string();
        normal.significant_findings.clear();
        normal.findings[0].status = FindingStatus::Negative;
        normal.findings[0].qualified_label = None;
        let report = ReportSynthesizer::default().synthesize(&normal);
        assert_eq!(report.urgency, Urgency::Low);
        assert_eq!(report.summary, "Medical Image Analysis Report - Normal Finding");
        assert!(report.symptoms.is_empty());
    }
}

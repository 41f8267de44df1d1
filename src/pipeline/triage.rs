//! The end-to-end triage pipeline.
//!
//! [`TriagePipeline::analyze`] runs preprocessing, inference, aggregation and
//! report synthesis for one upload and returns the resulting record. Only
//! preprocessing rejections (and a worker pool that cannot start) fail the
//! call; everything downstream degrades into data carried by the record.

use crate::core::config::PipelineConfig;
use crate::core::registry::ModelRegistry;
use crate::core::traits::{NarrativeGenerator, PredictionSink};
use crate::core::{TriageError, TriageResult};
use crate::domain::ReportSource;
use crate::pipeline::aggregator::aggregate;
use crate::pipeline::orchestrator::InferenceOrchestrator;
use crate::pipeline::preprocess::ImagePreprocessor;
use crate::pipeline::record::PredictionRecord;
use crate::pipeline::report::{GeminiNarrativeGenerator, ReportSynthesizer};
use crate::pipeline::stats::{PipelineStats, StatsManager};
use crate::utils::read_upload;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Builder for [`TriagePipeline`].
#[derive(Default)]
pub struct TriagePipelineBuilder {
    registry: Option<Arc<ModelRegistry>>,
    config: PipelineConfig,
    generator: Option<Arc<dyn NarrativeGenerator>>,
    sink: Option<Arc<dyn PredictionSink>>,
}

impl TriagePipelineBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model registry. Required.
    pub fn registry(mut self, registry: impl Into<Arc<ModelRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Sets the pipeline configuration. Values are clamped on build.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the narrative generator.
    ///
    /// Without one, an enabled `report.generation` section builds a
    /// [`GeminiNarrativeGenerator`] from the environment.
    pub fn generator(mut self, generator: Arc<dyn NarrativeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Sets the sink every finished record is handed to.
    pub fn sink(mut self, sink: Arc<dyn PredictionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if no registry was given.
    pub fn build(self) -> TriageResult<TriagePipeline> {
        let registry = self
            .registry
            .ok_or_else(|| TriageError::config_error("a model registry is required"))?;
        if registry.is_empty() {
            warn!("building a triage pipeline with no registered models");
        }

        let config = self.config.clamped();
        let orchestrator = InferenceOrchestrator::new(config.inference.clone());
        let preprocessor = ImagePreprocessor::new(config.preprocess.clone());

        let mut synthesizer = ReportSynthesizer::new(config.report.clone());
        let generator = match self.generator {
            Some(generator) => Some(generator),
            None if config.report.generation.enabled => {
                match GeminiNarrativeGenerator::from_env(&config.report.generation) {
                    Ok(generator) => Some(Arc::new(generator) as Arc<dyn NarrativeGenerator>),
                    Err(e) => {
                        warn!(error = %e, "narrative generation enabled but unavailable; reports will use the template");
                        None
                    }
                }
            }
            None => None,
        };
        if let Some(generator) = generator {
            synthesizer = synthesizer.with_generator(generator);
        }

        info!(
            models = registry.len(),
            workers = orchestrator.worker_count(),
            generation = config.report.generation.enabled,
            "triage pipeline ready"
        );

        Ok(TriagePipeline {
            registry,
            config,
            preprocessor,
            orchestrator,
            synthesizer,
            sink: self.sink,
            stats: StatsManager::new(),
        })
    }
}

/// Chest radiograph triage pipeline.
///
/// Shareable across threads; concurrent `analyze` calls are independent.
pub struct TriagePipeline {
    registry: Arc<ModelRegistry>,
    config: PipelineConfig,
    preprocessor: ImagePreprocessor,
    orchestrator: InferenceOrchestrator,
    synthesizer: ReportSynthesizer,
    sink: Option<Arc<dyn PredictionSink>>,
    stats: StatsManager,
}

impl std::fmt::Debug for TriagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriagePipeline")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl TriagePipeline {
    /// Starts a [`TriagePipelineBuilder`].
    pub fn builder() -> TriagePipelineBuilder {
        TriagePipelineBuilder::new()
    }

    /// Analyzes one upload.
    ///
    /// # Errors
    ///
    /// [`TriageError::OversizeInput`] and [`TriageError::UnsupportedFormat`]
    /// for rejected uploads, or a `ConfigError` if the inference pool cannot
    /// be built.
    pub fn analyze(&self, bytes: &[u8]) -> TriageResult<PredictionRecord> {
        let started = Instant::now();

        let prepared = match self.preprocessor.prepare(bytes, self.registry.all()) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "upload rejected");
                self.stats.record_failure(elapsed_ms(started));
                return Err(e);
            }
        };

        let outputs = match self.orchestrator.run(&self.registry, &prepared) {
            Ok(outputs) => outputs,
            Err(e) => {
                error!(error = %e, "inference could not be dispatched");
                self.stats.record_failure(elapsed_ms(started));
                return Err(e);
            }
        };
        let diagnosis = aggregate(&self.registry, &outputs, prepared.quality.score);
        let report = self.synthesizer.synthesize(&diagnosis);
        let record =
            PredictionRecord::build(diagnosis, report, prepared.quality, prepared.source_format);

        if let Some(sink) = &self.sink {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.persist(&record))) {
                Ok(Ok(())) => debug!("record persisted"),
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to persist prediction record");
                    self.stats.record_sink_failure();
                }
                Err(_) => {
                    warn!("prediction sink panicked");
                    self.stats.record_sink_failure();
                }
            }
        }

        let latency_ms = elapsed_ms(started);
        self.stats.record_success(
            latency_ms,
            record.diagnosis.unavailable_count(),
            record.report.source == ReportSource::TemplateFallback,
        );
        info!(
            primary_diagnosis = %record.diagnosis.primary_diagnosis,
            confidence = record.diagnosis.confidence,
            urgency = %record.report.urgency,
            latency_ms,
            "triage complete"
        );
        Ok(record)
    }

    /// Reads and analyzes an upload from disk, enforcing the size limit
    /// before reading.
    ///
    /// # Errors
    ///
    /// As [`TriagePipeline::analyze`], plus `Io` when the file cannot be read.
    pub fn analyze_file(&self, path: impl AsRef<Path>) -> TriageResult<PredictionRecord> {
        let bytes = read_upload(path.as_ref(), self.config.preprocess.max_input_bytes)?;
        self.analyze(&bytes)
    }

    /// The registered models.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The clamped configuration in effect.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats.get_stats()
    }

    /// Zeroes the counters.
    pub fn reset_stats(&self) {
        self.stats.reset_stats();
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GenerationConfig, ReportConfig};
    use crate::core::registry::standard_descriptors;
    use crate::core::traits::{Narrative, NarrativeRequest};
    use crate::domain::{ImageTensor, Urgency};
    use crate::pipeline::record::MemorySink;
    use crate::processors::format::fixtures::png_bytes;

    fn constant(values: Vec<f32>) -> impl Fn(&ImageTensor) -> Result<Vec<f32>, TriageError> + Send + Sync + 'static {
        move |_| Ok(values.clone())
    }

    /// Standard three-model registry with fixed outputs.
    fn registry(pneumonia: f32, tuberculosis: f32, lung_cancer: [f32; 3]) -> ModelRegistry {
        let mut descriptors = standard_descriptors().into_iter();
        let mut registry = ModelRegistry::new();
        registry
            .register(descriptors.next().unwrap(), constant(vec![pneumonia]))
            .unwrap();
        registry
            .register(descriptors.next().unwrap(), constant(vec![tuberculosis]))
            .unwrap();
        registry
            .register(descriptors.next().unwrap(), constant(lung_cancer.to_vec()))
            .unwrap();
        registry
    }

    struct RejectingSink;

    impl PredictionSink for RejectingSink {
        fn persist(&self, _: &PredictionRecord) -> Result<(), TriageError> {
            Err(TriageError::persistence_error("store offline"))
        }
    }

    struct PanickingSink;

    impl PredictionSink for PanickingSink {
        fn persist(&self, _: &PredictionRecord) -> Result<(), TriageError> {
            panic!("connection pool poisoned")
        }
    }

    struct FixedGenerator;

    impl NarrativeGenerator for FixedGenerator {
        fn generate(&self, request: &NarrativeRequest) -> Result<Narrative, TriageError> {
            Ok(Narrative {
                summary: format!("{} suspected", request.condition_name),
                description: "Generated description.".to_string(),
                recommendation: "Generated recommendation.".to_string(),
            })
        }
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TriagePipeline>();
    }

    #[test]
    fn test_builder_requires_registry() {
        assert!(matches!(
            TriagePipeline::builder().build(),
            Err(TriageError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_single_positive_scenario() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.87, 0.09, [0.95, 0.03, 0.02]))
            .sink(sink.clone())
            .build()
            .unwrap();

        let record = pipeline.analyze(&png_bytes(320, 320)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "pneumonia");
        assert!((record.diagnosis.confidence - 0.87).abs() < 1e-6);
        assert_eq!(record.report.urgency, Urgency::High);
        assert_eq!(record.report.source, ReportSource::TemplateFallback);
        assert_eq!(sink.len(), 1);

        let stats = pipeline.stats();
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.fallback_reports, 1);
    }

    #[test]
    fn test_all_negative_scenario() {
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.07, 0.12, [0.97, 0.02, 0.01]))
            .build()
            .unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "normal");
        assert!((record.diagnosis.confidence - 0.88).abs() < 1e-6);
        assert_eq!(record.report.urgency, Urgency::Low);
    }

    #[test]
    fn test_two_positive_scenario_uses_accuracy() {
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.70, 0.65, [0.97, 0.02, 0.01]))
            .build()
            .unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "pneumonia");
        assert!((record.diagnosis.confidence - 0.70).abs() < 1e-6);
        assert!(record.diagnosis.multiple_findings);
        assert!(record.report.summary.contains("Multiple Findings"));
    }

    #[test]
    fn test_rejected_upload_is_counted() {
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.1, 0.1, [0.9, 0.05, 0.05]))
            .build()
            .unwrap();
        let err = pipeline.analyze(b"not an image").unwrap_err();
        assert!(err.is_terminal());
        let stats = pipeline.stats();
        assert_eq!((stats.total_processed, stats.failed), (1, 1));

        pipeline.reset_stats();
        assert_eq!(pipeline.stats().total_processed, 0);
    }

    #[test]
    fn test_sink_failure_does_not_fail_the_request() {
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.2, 0.1, [0.9, 0.05, 0.05]))
            .sink(Arc::new(RejectingSink))
            .build()
            .unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "normal");
        assert_eq!(pipeline.stats().sink_failures, 1);
    }

    #[test]
    fn test_panicking_sink_is_counted_as_sink_failure() {
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.87, 0.09, [0.95, 0.03, 0.02]))
            .sink(Arc::new(PanickingSink))
            .build()
            .unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "pneumonia");
        let stats = pipeline.stats();
        assert_eq!((stats.successful, stats.sink_failures), (1, 1));
    }

    #[test]
    fn test_higher_accuracy_outranks_earlier_registration() {
        let mut descriptors = standard_descriptors().into_iter();
        let mut registry = ModelRegistry::new();
        registry
            .register(descriptors.next().unwrap(), constant(vec![0.90]))
            .unwrap();
        let mut tuberculosis = descriptors.next().unwrap();
        tuberculosis.reported_accuracy = 0.95;
        registry.register(tuberculosis, constant(vec![0.60])).unwrap();

        let pipeline = TriagePipeline::builder().registry(registry).build().unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "tuberculosis");
        assert!((record.diagnosis.confidence - 0.60).abs() < 1e-6);
        assert_eq!(record.diagnosis.significant_findings, vec!["tuberculosis", "pneumonia"]);
    }

    #[test]
    fn test_failing_model_is_reported_but_request_succeeds() {
        let mut descriptors = standard_descriptors().into_iter();
        let mut registry = ModelRegistry::new();
        registry
            .register(descriptors.next().unwrap(), |_: &ImageTensor| -> Result<Vec<f32>, TriageError> {
                Err(TriageError::model_inference_message("pneumonia", "session crashed"))
            })
            .unwrap();
        registry
            .register(descriptors.next().unwrap(), constant(vec![0.8]))
            .unwrap();

        let pipeline = TriagePipeline::builder().registry(registry).build().unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.diagnosis.primary_diagnosis, "tuberculosis");
        assert_eq!(record.diagnosis.all_predictions["pneumonia"], "error");
        assert_eq!(pipeline.stats().model_errors, 1);
    }

    #[test]
    fn test_generator_is_used_when_enabled() {
        let config = PipelineConfig::default().with_report(
            ReportConfig::default().with_generation(GenerationConfig::default().with_enabled(true)),
        );
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.87, 0.09, [0.95, 0.03, 0.02]))
            .config(config)
            .generator(Arc::new(FixedGenerator))
            .build()
            .unwrap();
        let record = pipeline.analyze(&png_bytes(256, 256)).unwrap();
        assert_eq!(record.report.source, ReportSource::Generated);
        assert_eq!(record.report.summary, "Pneumonia suspected");
        assert_eq!(record.report.urgency, Urgency::High);
    }

    #[test]
    fn test_analyze_file_enforces_size_limit() {
        let dir = std::env::temp_dir().join(format!("chest-triage-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("upload.png");
        std::fs::write(&path, png_bytes(256, 256)).unwrap();

        let config = PipelineConfig::default().with_preprocess(
            crate::core::config::PreprocessConfig::default().with_max_input_bytes(64),
        );
        let pipeline = TriagePipeline::builder()
            .registry(registry(0.1, 0.1, [0.9, 0.05, 0.05]))
            .config(config)
            .build()
            .unwrap();
        let err = pipeline.analyze_file(&path).unwrap_err();
        assert!(matches!(err, TriageError::OversizeInput { limit: 64, .. }));
        std::fs::remove_dir_all(&dir).ok();
    }
}

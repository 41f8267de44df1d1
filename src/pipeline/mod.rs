//! The triage pipeline module.
//!
//! Stages run in order: [`ImagePreprocessor`] ->
//! [`InferenceOrchestrator`] -> [`aggregate`] -> [`ReportSynthesizer`] ->
//! [`PredictionRecord`]. [`TriagePipeline`] drives them for one upload at a
//! time and keeps running statistics.

pub mod aggregator;
pub mod orchestrator;
pub mod preprocess;
pub mod record;
pub mod report;
pub mod stats;
pub mod triage;

pub use aggregator::aggregate;
pub use orchestrator::InferenceOrchestrator;
pub use preprocess::{ImagePreprocessor, PreparedImage};
pub use record::{MemorySink, PredictionRecord};
pub use report::{GeminiNarrativeGenerator, NarrativeOutcome, ReportSynthesizer, urgency_for};
pub use stats::{PipelineStats, StatsManager};
pub use triage::{TriagePipeline, TriagePipelineBuilder};

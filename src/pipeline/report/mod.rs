//! Report synthesis: urgency banding, optional generated narrative and the
//! deterministic template it falls back to.

mod generator;
mod synthesizer;
mod template;

pub use generator::GeminiNarrativeGenerator;
pub use synthesizer::{NarrativeOutcome, ReportSynthesizer};
pub use template::{LOW_QUALITY_NOTE, knowledge_of, template_narrative, urgency_for};

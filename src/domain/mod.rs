//! Domain-level structures shared across the triage pipeline.
//!
//! This module groups the value types that flow between pipeline stages: model
//! inputs, per-model outputs, the aggregated diagnosis and the report, plus the
//! static disease knowledge table the report draws on.

pub mod diagnosis;
pub mod knowledge;
pub mod prediction;
pub mod report;
pub mod tensor;

pub use diagnosis::{AggregatedDiagnosis, FindingStatus, ModelFinding};
pub use knowledge::{DiseaseKnowledge, display_name, knowledge_for};
pub use prediction::{ClassProbability, ModelOutput};
pub use report::{MedicalReport, ReportSource, SeverityLevel, Urgency};
pub use tensor::{ImageTensor, InputSpec};

//! Trait definitions for the triage pipeline.
//!
//! These are the seams where collaborators plug in: disease classifiers
//! (`model`), the external narrative generation service (`narrative`) and the
//! persistence layer (`sink`). Everything behind a trait can be replaced by a
//! closure or a small struct in tests.

pub mod model;
pub mod narrative;
pub mod sink;

pub use model::DiseaseModel;
pub use narrative::{Narrative, NarrativeGenerator, NarrativeRequest};
pub use sink::PredictionSink;

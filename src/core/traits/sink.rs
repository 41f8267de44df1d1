//! The persistence capability.

use crate::core::TriageError;
use crate::pipeline::PredictionRecord;

/// External store for finished prediction records.
///
/// The pipeline hands each record over once and does not retry; durability is
/// the sink's concern.
pub trait PredictionSink: Send + Sync {
    /// Stores one record.
    fn persist(&self, record: &PredictionRecord) -> Result<(), TriageError>;
}

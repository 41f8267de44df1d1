//! The classifier capability.

use crate::core::TriageError;
use crate::domain::ImageTensor;

/// A trained classifier for one disease hypothesis.
///
/// Implementations return the raw output vector of the network; the
/// descriptor's [`OutputActivation`](crate::core::registry::OutputActivation)
/// decides how it is turned into class probabilities. A model must be safe to
/// call from several threads at once.
///
/// Any closure of the right shape is a model:
///
/// ```rust
/// use chest_triage::core::TriageError;
/// use chest_triage::core::traits::DiseaseModel;
/// use chest_triage::domain::{ImageTensor, InputSpec};
///
/// let model = |_: &ImageTensor| -> Result<Vec<f32>, TriageError> { Ok(vec![0.2, 0.8]) };
/// let tensor = ImageTensor::filled(InputSpec::keras_rgb(), 0.5);
/// assert_eq!(model.infer(&tensor).unwrap(), vec![0.2, 0.8]);
/// ```
pub trait DiseaseModel: Send + Sync {
    /// Runs the forward pass on a preprocessed tensor.
    fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, TriageError>;
}

impl<F> DiseaseModel for F
where
    F: Fn(&ImageTensor) -> Result<Vec<f32>, TriageError> + Send + Sync,
{
    fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, TriageError> {
        self(input)
    }
}

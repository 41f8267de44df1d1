//! The model registry.
//!
//! A [`ModelRegistry`] is assembled once at startup with `&mut self`
//! registration and then shared read-only behind an `Arc`. Entries keep their
//! registration order, which the aggregator uses to break accuracy ties.

use crate::core::traits::DiseaseModel;
use crate::core::validation::{validate_finite, validate_non_empty, validate_range};
use crate::core::{ERROR_LABEL, NORMAL_LABEL, TriageError};
use crate::domain::{InputSpec, ModelOutput};
use crate::utils::{check_distribution, softmax};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How a model's raw output vector maps onto its class labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputActivation {
    /// The vector is already a probability distribution over the labels.
    #[default]
    Probabilities,
    /// The vector holds logits; softmax is applied.
    Logits,
    /// A single positive-class probability `p` for a two-label model, expanded
    /// to `[1 - p, p]`.
    Sigmoid,
}

impl OutputActivation {
    /// Converts a raw output into probabilities aligned with `label_count` labels.
    ///
    /// # Errors
    ///
    /// Returns an output decoding error for a wrong length, non-finite values,
    /// or a vector that is not a distribution.
    pub fn decode(&self, raw: &[f32], label_count: usize, tolerance: f32) -> Result<Vec<f32>, TriageError> {
        if let Some(v) = raw.iter().find(|v| !v.is_finite()) {
            return Err(TriageError::output_decoding_error(format!(
                "output contains non-finite value {v}"
            )));
        }

        let probabilities = match self {
            OutputActivation::Sigmoid => {
                if raw.len() != 1 {
                    return Err(TriageError::output_decoding_error(format!(
                        "sigmoid output must hold 1 value, got {}",
                        raw.len()
                    )));
                }
                let p = raw[0];
                if !(0.0..=1.0).contains(&p) {
                    return Err(TriageError::output_decoding_error(format!(
                        "sigmoid output {p} is outside [0, 1]"
                    )));
                }
                vec![1.0 - p, p]
            }
            OutputActivation::Logits => {
                Self::check_len(raw, label_count)?;
                softmax(raw)
            }
            OutputActivation::Probabilities => {
                Self::check_len(raw, label_count)?;
                raw.to_vec()
            }
        };

        check_distribution(&probabilities, tolerance).map_err(TriageError::output_decoding_error)?;
        Ok(probabilities)
    }

    fn check_len(raw: &[f32], label_count: usize) -> Result<(), TriageError> {
        if raw.len() != label_count {
            return Err(TriageError::output_decoding_error(format!(
                "output has {} values for {label_count} class labels",
                raw.len()
            )));
        }
        Ok(())
    }
}

/// Static facts about one registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique disease key, e.g. `"pneumonia"`.
    pub disease_key: String,
    /// Input family of the model.
    #[serde(default)]
    pub input: InputSpec,
    /// Class labels in output order.
    pub class_labels: Vec<String>,
    /// Label of the negative class.
    #[serde(default = "ModelDescriptor::default_negative_label")]
    pub negative_label: String,
    /// Validation accuracy reported for the model, in `[0, 1]`.
    pub reported_accuracy: f64,
    /// How raw outputs are read.
    #[serde(default)]
    pub output: OutputActivation,
}

impl ModelDescriptor {
    fn default_negative_label() -> String {
        NORMAL_LABEL.to_string()
    }

    /// Creates a descriptor with the default input family and negative label.
    pub fn new<S: Into<String>>(
        disease_key: impl Into<String>,
        class_labels: impl IntoIterator<Item = S>,
        reported_accuracy: f64,
    ) -> Self {
        Self {
            disease_key: disease_key.into(),
            input: InputSpec::default(),
            class_labels: class_labels.into_iter().map(Into::into).collect(),
            negative_label: Self::default_negative_label(),
            reported_accuracy,
            output: OutputActivation::default(),
        }
    }

    /// Sets the input family.
    pub fn with_input(mut self, input: InputSpec) -> Self {
        self.input = input;
        self
    }

    /// Sets the negative label.
    pub fn with_negative_label(mut self, label: impl Into<String>) -> Self {
        self.negative_label = label.into();
        self
    }

    /// Sets the output activation.
    pub fn with_output(mut self, output: OutputActivation) -> Self {
        self.output = output;
        self
    }

    /// Checks that the descriptor is internally consistent.
    pub fn validate(&self) -> Result<(), TriageError> {
        if self.disease_key.trim().is_empty() {
            return Err(TriageError::invalid_input("disease_key cannot be empty"));
        }
        validate_non_empty(&self.class_labels, "class_labels")?;
        if !self.class_labels.contains(&self.negative_label) {
            return Err(TriageError::validation_error(
                &self.disease_key,
                "negative_label",
                "one of class_labels",
                &self.negative_label,
            ));
        }
        if self.class_labels.iter().any(|l| l == ERROR_LABEL) {
            return Err(TriageError::validation_error(
                &self.disease_key,
                "class_labels",
                "no reserved label",
                ERROR_LABEL,
            ));
        }
        validate_finite(self.reported_accuracy, "reported_accuracy")?;
        validate_range(self.reported_accuracy, 0.0, 1.0, "reported_accuracy")?;
        if self.input.height == 0 || self.input.width == 0 {
            return Err(TriageError::validation_error(
                &self.disease_key,
                "input",
                "non-zero height and width",
                &format!("{}x{}", self.input.width, self.input.height),
            ));
        }
        if self.input.channels != 1 && self.input.channels != 3 {
            return Err(TriageError::validation_error(
                &self.disease_key,
                "input.channels",
                "1 or 3",
                &self.input.channels.to_string(),
            ));
        }
        if self.output == OutputActivation::Sigmoid
            && (self.class_labels.len() != 2 || self.class_labels[0] != self.negative_label)
        {
            return Err(TriageError::validation_error(
                &self.disease_key,
                "class_labels",
                "[negative, positive] for a sigmoid output",
                &self.class_labels.join(","),
            ));
        }
        Ok(())
    }

    /// Whether `label` is one of this model's disease classes.
    pub fn is_positive_label(&self, label: &str) -> bool {
        label != self.negative_label && label != ERROR_LABEL
    }

    /// Disease-qualified form of a positive label.
    ///
    /// A label that already is, or starts with, the disease key is kept as-is;
    /// otherwise the key is prefixed, e.g. `malignant` -> `lung_cancer_malignant`.
    pub fn qualified_label(&self, label: &str) -> String {
        if label.starts_with(self.disease_key.as_str()) {
            label.to_string()
        } else {
            format!("{}_{}", self.disease_key, label)
        }
    }

    /// Decodes a raw output vector into a [`ModelOutput`].
    pub fn decode_output(&self, raw: &[f32], tolerance: f32) -> Result<ModelOutput, TriageError> {
        let probabilities = self.output.decode(raw, self.class_labels.len(), tolerance)?;
        Ok(ModelOutput::from_probabilities(
            &self.disease_key,
            &self.class_labels,
            &probabilities,
        ))
    }
}

/// The three classifiers of the reference deployment.
///
/// Pneumonia and tuberculosis emit one sigmoid value; lung cancer emits a
/// softmax over normal, benign and malignant.
pub fn standard_descriptors() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("pneumonia", ["normal", "pneumonia"], 0.942)
            .with_output(OutputActivation::Sigmoid),
        ModelDescriptor::new("tuberculosis", ["normal", "tuberculosis"], 0.918)
            .with_output(OutputActivation::Sigmoid),
        ModelDescriptor::new("lung_cancer", ["normal", "benign", "malignant"], 0.895),
    ]
}

/// Per-model status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    /// Disease key.
    pub disease_key: String,
    /// Class labels in output order.
    pub class_labels: Vec<String>,
    /// Reported accuracy.
    pub reported_accuracy: f64,
    /// Input tensor shape including the batch dimension.
    pub input_shape: [usize; 4],
    /// Output activation.
    pub output: OutputActivation,
}

struct RegisteredModel {
    descriptor: ModelDescriptor,
    model: Arc<dyn DiseaseModel>,
}

/// Registered models in registration order.
#[derive(Default)]
pub struct ModelRegistry {
    entries: Vec<RegisteredModel>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.all().map(|d| &d.disease_key).collect::<Vec<_>>())
            .finish()
    }
}

/// Restartable iterator over registered descriptors.
#[derive(Clone)]
pub struct Descriptors<'a> {
    inner: std::slice::Iter<'a, RegisteredModel>,
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = &'a ModelDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| &entry.descriptor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Descriptors<'_> {}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::DuplicateModel`] when the disease key is taken and
    /// an `InvalidInput` error when the descriptor is malformed.
    pub fn register(
        &mut self,
        descriptor: ModelDescriptor,
        model: impl DiseaseModel + 'static,
    ) -> Result<(), TriageError> {
        self.register_shared(descriptor, Arc::new(model))
    }

    /// Registers a model that is already behind an `Arc`.
    pub fn register_shared(
        &mut self,
        descriptor: ModelDescriptor,
        model: Arc<dyn DiseaseModel>,
    ) -> Result<(), TriageError> {
        if self.get(&descriptor.disease_key).is_some() {
            return Err(TriageError::duplicate_model(&descriptor.disease_key));
        }
        descriptor.validate()?;
        debug!(
            disease_key = %descriptor.disease_key,
            accuracy = descriptor.reported_accuracy,
            "registered model"
        );
        self.entries.push(RegisteredModel { descriptor, model });
        Ok(())
    }

    /// Builder-style registration.
    pub fn with_model(
        mut self,
        descriptor: ModelDescriptor,
        model: impl DiseaseModel + 'static,
    ) -> Result<Self, TriageError> {
        self.register(descriptor, model)?;
        Ok(self)
    }

    /// Descriptors in registration order.
    pub fn all(&self) -> Descriptors<'_> {
        Descriptors {
            inner: self.entries.iter(),
        }
    }

    /// Descriptor and model pairs in registration order.
    pub(crate) fn models(&self) -> impl Iterator<Item = (&ModelDescriptor, &Arc<dyn DiseaseModel>)> {
        self.entries.iter().map(|e| (&e.descriptor, &e.model))
    }

    /// Looks up a descriptor by disease key.
    pub fn get(&self, disease_key: &str) -> Option<&ModelDescriptor> {
        self.all().find(|d| d.disease_key == disease_key)
    }

    /// Registration index of a disease key.
    pub fn position(&self, disease_key: &str) -> Option<usize> {
        self.all().position(|d| d.disease_key == disease_key)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct input families, in order of first use.
    pub fn input_specs(&self) -> Vec<InputSpec> {
        let mut specs: Vec<InputSpec> = Vec::new();
        for descriptor in self.all() {
            if !specs.contains(&descriptor.input) {
                specs.push(descriptor.input.clone());
            }
        }
        specs
    }

    /// Per-model status summary.
    pub fn status(&self) -> Vec<ModelStatus> {
        self.all()
            .map(|d| ModelStatus {
                disease_key: d.disease_key.clone(),
                class_labels: d.class_labels.clone(),
                reported_accuracy: d.reported_accuracy,
                input_shape: d.input.tensor_shape(),
                output: d.output,
            })
            .collect()
    }
}

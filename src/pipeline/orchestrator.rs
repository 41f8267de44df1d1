//! The inference orchestrator stage.
//!
//! Every registered model is invoked on a bounded rayon pool built for that
//! invocation alone, so concurrent runs never queue behind each other. Each call is
//! isolated: a panic, an error, a malformed output vector, a missing tensor or
//! a call that outlives its deadline becomes that model's error sentinel while
//! the others carry on. [`InferenceOrchestrator::run`] returns only once every
//! model has an output or a sentinel, in registration order.

use crate::core::config::InferencePolicy;
use crate::core::registry::ModelRegistry;
use crate::core::TriageError;
use crate::domain::ModelOutput;
use crate::pipeline::preprocess::PreparedImage;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum CallEvent {
    Started {
        index: usize,
        at: Instant,
    },
    Finished {
        index: usize,
        output: ModelOutput,
        elapsed: Duration,
    },
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Dispatches model calls and collects their outputs.
#[derive(Debug, Clone)]
pub struct InferenceOrchestrator {
    policy: InferencePolicy,
}

impl InferenceOrchestrator {
    /// Creates an orchestrator with a clamped policy.
    pub fn new(policy: InferencePolicy) -> Self {
        Self {
            policy: policy.clamped(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &InferencePolicy {
        &self.policy
    }

    /// Number of worker threads each invocation gets.
    pub fn worker_count(&self) -> usize {
        self.policy
            .max_threads
            .unwrap_or_else(rayon::current_num_threads)
    }

    fn build_pool(&self, calls: usize) -> Result<rayon::ThreadPool, TriageError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count().min(calls).max(1))
            .thread_name(|i| format!("triage-infer-{i}"))
            .build()
            .map_err(|e| TriageError::config_error(format!("cannot build inference pool: {e}")))
    }

    /// Runs every registered model on the prepared image.
    ///
    /// The pool is dropped on return. Calls abandoned at their deadline keep
    /// its threads until they finish, then those threads exit.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the worker pool cannot be built.
    pub fn run(
        &self,
        registry: &ModelRegistry,
        prepared: &PreparedImage,
    ) -> Result<Vec<ModelOutput>, TriageError> {
        let count = registry.len();
        if count == 0 {
            return Ok(Vec::new());
        }
        let pool = self.build_pool(count)?;
        let mut outputs: Vec<Option<ModelOutput>> = vec![None; count];
        let mut started: Vec<Option<Instant>> = vec![None; count];
        let timeout = Duration::from_millis(self.policy.model_timeout_ms);
        let tolerance = self.policy.probability_tolerance;
        let (tx, rx) = mpsc::channel::<CallEvent>();

        for (index, (descriptor, model)) in registry.models().enumerate() {
            let Some(tensor) = prepared.tensor_for(&descriptor.input) else {
                warn!(disease_key = %descriptor.disease_key, "no tensor prepared for model input");
                outputs[index] = Some(ModelOutput::sentinel(
                    &descriptor.disease_key,
                    "no tensor prepared for this input family",
                ));
                continue;
            };

            let descriptor = descriptor.clone();
            let model = model.clone();
            let tx = tx.clone();
            pool.spawn(move || {
                let at = Instant::now();
                let _ = tx.send(CallEvent::Started { index, at });

                let result = panic::catch_unwind(AssertUnwindSafe(|| model.infer(&tensor)));
                let elapsed = at.elapsed();
                let key = descriptor.disease_key.as_str();
                let output = match result {
                    Ok(Ok(raw)) => descriptor
                        .decode_output(&raw, tolerance)
                        .unwrap_or_else(|e| ModelOutput::sentinel(key, e.to_string())),
                    Ok(Err(e)) => ModelOutput::sentinel(key, e.to_string()),
                    Err(payload) => ModelOutput::sentinel(
                        key,
                        format!("model panicked: {}", panic_message(payload.as_ref())),
                    ),
                };
                let _ = tx.send(CallEvent::Finished {
                    index,
                    output,
                    elapsed,
                });
            });
        }
        drop(tx);

        let ceiling = Instant::now() + timeout.saturating_mul(u32::try_from(count).unwrap_or(u32::MAX));
        let mut pending = outputs.iter().filter(|o| o.is_none()).count();

        while pending > 0 {
            let now = Instant::now();
            for index in 0..count {
                if outputs[index].is_none()
                    && started[index].is_some_and(|at| now.duration_since(at) >= timeout)
                {
                    outputs[index] = Some(self.timed_out(registry, index, "call exceeded its deadline"));
                    pending -= 1;
                }
            }
            if pending == 0 {
                break;
            }
            if now >= ceiling {
                for index in 0..count {
                    if outputs[index].is_none() {
                        outputs[index] =
                            Some(self.timed_out(registry, index, "call did not finish before the global deadline"));
                    }
                }
                break;
            }

            let next_wake = started
                .iter()
                .zip(&outputs)
                .filter_map(|(at, out)| match (at, out) {
                    (Some(at), None) => Some(*at + timeout),
                    _ => None,
                })
                .fold(ceiling, Instant::min);

            match rx.recv_timeout(next_wake.saturating_duration_since(now)) {
                Ok(CallEvent::Started { index, at }) => started[index] = Some(at),
                Ok(CallEvent::Finished {
                    index,
                    output,
                    elapsed,
                }) => {
                    if outputs[index].is_some() {
                        debug!(disease_key = %output.disease_key, "dropping late model result");
                        continue;
                    }
                    let output = if elapsed > timeout {
                        self.timed_out(registry, index, "call exceeded its deadline")
                    } else {
                        output
                    };
                    if let Some(error) = &output.error {
                        warn!(disease_key = %output.disease_key, %error, "model call failed");
                    } else {
                        debug!(
                            disease_key = %output.disease_key,
                            top_label = %output.top_label,
                            top_probability = output.top_probability,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "model call finished"
                        );
                    }
                    outputs[index] = Some(output);
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    for index in 0..count {
                        if outputs[index].is_none() {
                            outputs[index] =
                                Some(self.timed_out(registry, index, "worker exited without a result"));
                        }
                    }
                    break;
                }
            }
        }

        Ok(outputs
            .into_iter()
            .enumerate()
            .map(|(index, output)| {
                output.unwrap_or_else(|| self.timed_out(registry, index, "no result"))
            })
            .collect())
    }

    fn timed_out(&self, registry: &ModelRegistry, index: usize, reason: &str) -> ModelOutput {
        let key = registry
            .all()
            .nth(index)
            .map(|d| d.disease_key.as_str())
            .unwrap_or_default();
        warn!(
            disease_key = %key,
            timeout_ms = self.policy.model_timeout_ms,
            "{reason}"
        );
        ModelOutput::sentinel(key, format!("{reason} ({} ms)", self.policy.model_timeout_ms))
    }
}

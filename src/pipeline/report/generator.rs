//! Narrative generation over a Gemini-style `generateContent` endpoint.

use crate::core::config::GenerationConfig;
use crate::core::traits::{Narrative, NarrativeGenerator, NarrativeRequest};
use crate::core::TriageError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Extracts a [`Narrative`] from generated text.
///
/// Accepts bare JSON as well as JSON wrapped in a markdown fence or in prose,
/// by parsing the outermost `{...}` span.
pub(crate) fn parse_narrative(text: &str) -> Result<Narrative, TriageError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(TriageError::report_unavailable(
            "generated text contains no JSON object",
        ));
    };
    if end < start {
        return Err(TriageError::report_unavailable(
            "generated text contains no JSON object",
        ));
    }
    serde_json::from_str::<Narrative>(&text[start..=end]).map_err(|e| {
        TriageError::report_unavailable(format!("generated JSON is not a narrative: {e}"))
    })
}

/// Blocking HTTP client for a hosted text generation model.
///
/// One POST per call. The client carries its own request timeout; the report
/// synthesizer enforces an outer deadline independently.
#[derive(Clone)]
pub struct GeminiNarrativeGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiNarrativeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiNarrativeGenerator")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiNarrativeGenerator {
    /// Creates a generator with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an empty key, or an `Http` error when the
    /// client cannot be built.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self, TriageError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TriageError::config_error("narrative generation API key is empty"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Creates a generator reading its key from the environment variable named
    /// by `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when the variable is unset or empty.
    pub fn from_env(config: &GenerationConfig) -> Result<Self, TriageError> {
        let key = std::env::var(&config.api_key_env).map_err(|_| {
            TriageError::config_error_with_context(
                "generation.api_key_env",
                &config.api_key_env,
                "environment variable is not set",
            )
        })?;
        Self::new(config, key)
    }

    /// The resolved `generateContent` URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn prompt(request: &NarrativeRequest) -> String {
        let mut prompt = format!(
            "You are assisting with a chest X-ray triage report.\n\
             Primary finding: {} ({}).\n\
             Model confidence: {:.1}%.\n\
             Urgency: {}.\n\
             Image quality score: {:.1}/100.\n",
            request.condition_name,
            request.primary_diagnosis,
            f64::from(request.confidence) * 100.0,
            request.urgency,
            request.image_quality,
        );
        if !request.additional_findings.is_empty() {
            prompt.push_str(&format!(
                "Additional findings: {}.\n",
                request.additional_findings.join(", ")
            ));
        }
        prompt.push_str(
            "Respond with only a JSON object with the string fields \"summary\", \
             \"description\" and \"recommendation\". Keep the recommendation \
             consistent with the urgency and do not state a definitive diagnosis.",
        );
        prompt
    }
}

impl NarrativeGenerator for GeminiNarrativeGenerator {
    fn generate(&self, request: &NarrativeRequest) -> Result<Narrative, TriageError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": Self::prompt(request) }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response: GenerateResponse = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        debug!(chars = text.len(), "received generated narrative");

        if text.trim().is_empty() {
            return Err(TriageError::report_unavailable("response carried no text"));
        }
        parse_narrative(&text)
    }
}

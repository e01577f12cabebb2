//! Gemini REST transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextGenerator;
use crate::config::EvaluatorConfig;
use crate::error::{EvaluatorErrorKind, InterviewError, Result};

/// Models offered by the `/api/models` endpoint.
pub const AVAILABLE_MODELS: [&str; 3] = ["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"];

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Text generation over the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client from configuration and an API key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidationError` if the key is blank and
    /// `EvaluatorUnavailable` if the HTTP client cannot be built.
    pub fn new(config: &EvaluatorConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(InterviewError::config_validation(
                format!("{} is not set", config.api_key_env),
                format!(
                    "Export {} or add it to a .env file",
                    config.api_key_env
                ),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout() + Duration::from_secs(5))
            .build()
            .map_err(|e| {
                InterviewError::evaluator_unavailable(EvaluatorErrorKind::Other, e.to_string())
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(status_error(status, &body_text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body_text).map_err(|e| {
            InterviewError::evaluator_unavailable(
                EvaluatorErrorKind::Other,
                format!("unexpected response body: {e}"),
            )
        })?;

        let text = parsed.text();
        debug!(model = %self.model, reply_len = text.len(), "Model replied");
        Ok(text)
    }
}

/// Maps a non-success HTTP status onto an evaluator error.
fn status_error(status: u16, body: &str) -> InterviewError {
    let kind = match status {
        401 | 403 => EvaluatorErrorKind::Authentication,
        429 => EvaluatorErrorKind::RateLimit,
        500..=599 => EvaluatorErrorKind::Server,
        _ => EvaluatorErrorKind::Other,
    };
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    InterviewError::evaluator_unavailable(kind, format!("HTTP {status}: {snippet}"))
}

fn transport_error(err: reqwest::Error) -> InterviewError {
    let kind = if err.is_timeout() {
        EvaluatorErrorKind::Timeout
    } else {
        EvaluatorErrorKind::Network
    };
    // reqwest includes the URL, and with it the key, in its messages
    InterviewError::evaluator_unavailable(kind, err.without_url().to_string())
}

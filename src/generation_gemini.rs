//! Gemini Generative Provider
//!
//! Implements `GenerationProvider` for Gemini chat models over the REST
//! API, with JSON output mode enabled on every call.
//!
//! ## API Details
//!
//! - Endpoint: `POST {base}/models/{model}:generateContent`
//! - Auth: `x-goog-api-key: {api_key}` header
//! - Body: `{ contents: [{ role, parts: [{ text }] }], generationConfig }`
//! - `generationConfig.responseMimeType: "application/json"` requests
//!   structured output
//! - Withheld output surfaces as `promptFeedback.blockReason` or a
//!   `SAFETY` candidate finish reason, never as an HTTP error

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CoachConfig;
use crate::generation::{GenerationError, GenerationProvider, GenerationResult};
use crate::http_client::build_http_client;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Gemini generative provider over the REST API.
pub struct GeminiGenerativeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerativeProvider {
    /// Create a provider from the engine configuration.
    pub fn new(config: &CoachConfig) -> Self {
        Self {
            client: build_http_client(config.request_timeout),
            api_key: config.google_api_key.clone(),
            model: config.generation_model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
            },
        })
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::NetworkError {
                message: format!("request to {} timed out", self.base_url),
            }
        } else if err.is_connect() {
            GenerationError::NetworkError {
                message: format!("cannot connect to Gemini API at {}: {}", self.base_url, err),
            }
        } else {
            GenerationError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> GenerationError {
        let message = serde_json::from_str::<GeminiErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error)
            .and_then(|d| d.message)
            .unwrap_or_else(|| body_text.to_string());

        match status {
            401 | 403 => GenerationError::AuthenticationFailed {
                message: format!("Gemini rejected the API key: {}", message),
            },
            400 => GenerationError::InvalidConfig {
                message: format!("Gemini bad request for model '{}': {}", self.model, message),
            },
            404 => GenerationError::InvalidConfig {
                message: format!(
                    "generative model '{}' not found at {}: {}",
                    self.model, self.base_url, message
                ),
            },
            _ => GenerationError::ServerError { message, status },
        }
    }

    /// Pull the model's text out of a 200 response.
    ///
    /// A block reason anywhere in the envelope wins over any partial
    /// content; a candidate with no text is an empty response.
    fn extract_text(&self, body_text: &str) -> GenerationResult<String> {
        let parsed: GeminiGenerateResponse =
            serde_json::from_str(body_text).map_err(|e| GenerationError::ParseError {
                message: format!("failed to parse generateContent response: {}", e),
            })?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(GenerationError::Blocked { reason });
        }

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Err(GenerationError::EmptyResponse);
        };

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(GenerationError::Blocked {
                reason: "SAFETY".to_string(),
            });
        }

        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(GenerationError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerativeProvider {
    async fn generate_structured(&self, prompt: &str) -> GenerationResult<String> {
        if self.api_key.is_empty() {
            return Err(GenerationError::AuthenticationFailed {
                message: "Gemini API key is not configured (GOOGLE_API_KEY)".to_string(),
            });
        }

        let body = self.build_request_body(prompt);
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::NetworkError {
                message: format!("failed to read response body: {}", e),
            })?;

        if status == 200 {
            self.extract_text(&text)
        } else {
            Err(self.map_http_error(status, &text))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Model-service client.
//!
//! [`ModelService`] is the seam between the request lifecycle and the wire:
//! the session only ever sees `generate(prompt) -> Result<GenerateResponse>`.
//! [`GenerateClient`] is the HTTP implementation against the hosted
//! generate endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use tracing::{debug, warn};

use crate::api::{GenerateRequest, GenerateResponse};

/// Environment variable the credential is read from at startup.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Issue exactly one generate request for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, ServiceError>;
}

/// Non-success HTTP response from the service, summarized for display.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "API request failed with HTTP {}", self.status)
        } else {
            write!(f, "{} (HTTP {})", self.message, self.status)
        }
    }
}

impl std::error::Error for ApiError {}

pub struct GenerateClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GenerateClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelService for GenerateClient {
    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, ServiceError> {
        let request = GenerateRequest::user_prompt(prompt);

        debug!(model = %self.model, "sending generate request");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "generate request rejected");
            return Err(Box::new(ApiError {
                status,
                message: error_summary(&body),
            }));
        }

        let parsed = response.json::<GenerateResponse>().await?;
        debug!("generate request completed");
        Ok(parsed)
    }
}

/// Pull a one-line human-readable summary out of an error body. Service
/// errors are usually JSON with a message under `error.message`; anything
/// else is collapsed to a single line verbatim.
fn error_summary(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| value.get("message").and_then(serde_json::Value::as_str));
        if let Some(text) = summary {
            return collapse_whitespace(text);
        }
    }

    collapse_whitespace(trimmed)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slashes() {
        let client = GenerateClient::new("https://api.test.example/v1///", "key", "test-model");
        assert_eq!(
            client.endpoint(),
            "https://api.test.example/v1/models/test-model:generateContent"
        );
    }

    #[test]
    fn error_summary_prefers_nested_message() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been\n exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(error_summary(body), "Resource has been exhausted");
    }

    #[test]
    fn error_summary_falls_back_to_raw_body() {
        assert_eq!(error_summary("  upstream \n unavailable "), "upstream unavailable");
        assert_eq!(error_summary(""), "");
    }

    #[test]
    fn api_error_display_with_and_without_message() {
        let with_message = ApiError {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            with_message.to_string(),
            "quota exceeded (HTTP 429 Too Many Requests)"
        );

        let blank = ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: String::new(),
        };
        assert_eq!(
            blank.to_string(),
            "API request failed with HTTP 502 Bad Gateway"
        );
    }
}

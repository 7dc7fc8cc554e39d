//! OpenAI chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use diyguide_core::{ReasoningError, ReasoningFailureKind};
use diyguide_pipeline::{ApiKey, CompletionRequest, ReasoningProvider};
use serde_json::{json, Value};
use tracing::debug;

/// Default API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Reasoning provider backed by `POST {base}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReasoningError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReasoningError::new(ReasoningFailureKind::Connection, e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat body: persona and instructions as the system message, the input
    /// as the user message.
    fn request_body(request: &CompletionRequest) -> Value {
        json!({
            "model": request.model,
            "messages": [
                {
                    "role": "system",
                    "content": format!("{}\n\n{}", request.system_role, request.instructions),
                },
                { "role": "user", "content": request.input },
            ],
        })
    }

    fn parse_response(body: &str) -> Result<String, ReasoningError> {
        let json: Value = serde_json::from_str(body).map_err(|e| {
            ReasoningError::new(
                ReasoningFailureKind::MalformedResponse,
                format!("Invalid JSON: {}", e),
            )
        })?;

        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ReasoningError::new(
                    ReasoningFailureKind::MalformedResponse,
                    "No message content in response",
                )
            })?;

        if content.trim().is_empty() {
            return Err(ReasoningError::new(
                ReasoningFailureKind::MalformedResponse,
                "Empty message content",
            ));
        }
        Ok(content.to_string())
    }

    /// Map a non-success status to a failure kind. The provider's own error
    /// message is used when the body carries one.
    fn map_http_error(status: u16, body: &str) -> ReasoningError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}", status));

        let kind = match status {
            401 | 403 => ReasoningFailureKind::Unauthorized,
            429 => ReasoningFailureKind::RateLimited,
            400 | 404 | 422 => ReasoningFailureKind::BadRequest,
            408 | 504 => ReasoningFailureKind::Timeout,
            _ => ReasoningFailureKind::Provider,
        };
        ReasoningError::new(kind, message)
    }

    fn map_transport_error(err: reqwest::Error) -> ReasoningError {
        if err.is_timeout() {
            ReasoningError::new(ReasoningFailureKind::Timeout, "request timed out")
        } else {
            ReasoningError::new(
                ReasoningFailureKind::Connection,
                format!("Request failed: {}", err),
            )
        }
    }
}

#[async_trait]
impl ReasoningProvider for OpenAiClient {
    async fn complete(
        &self,
        credential: &ApiKey,
        request: &CompletionRequest,
    ) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_transport_error)?;

        if !status.is_success() {
            return Err(Self::map_http_error(status.as_u16(), &body));
        }
        Self::parse_response(&body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

//! HTTP narrative backend
//!
//! Talks to an OpenAI-compatible chat completion endpoint and asks for
//! JSON-schema constrained output. One request per call; retries and the
//! overall deadline belong to the caller.

use crate::request::{parse_candidate, NarrativeRequest};
use crate::NarrativeBackend;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use storyline_core::{BackendError, NormalizedEvent, ProjectContext, RawCandidate};

/// Longest slice of an error body kept in `BackendError` reasons
const ERROR_BODY_PREVIEW: usize = 200;

/// Connection settings for [`HttpNarrativeBackend`]
///
/// The API key is supplied by the host at construction time and never read
/// from the environment here.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    /// Model name sent with each request
    pub model: String,
    /// Environment variable the host reads the API key from
    pub api_key_env: String,
    /// Bearer token
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_output_tokens: Option<u32>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "STORYLINE_API_KEY".to_string(),
            api_key: None,
            temperature: 0.7,
            max_output_tokens: None,
            connect_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Failure to construct the HTTP backend
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Endpoint is not a valid base URL
    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// HTTP client could not be initialized
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Narrative backend over an OpenAI-compatible HTTP API
#[derive(Debug, Clone)]
pub struct HttpNarrativeBackend {
    client: reqwest::Client,
    completions_url: Url,
    config: BackendConfig,
}

impl HttpNarrativeBackend {
    /// Create backend from configuration
    ///
    /// # Errors
    /// - `BuildError::InvalidEndpoint` if the endpoint does not parse
    /// - `BuildError::Client` if the HTTP client cannot be built
    pub fn new(config: BackendConfig) -> Result<Self, BuildError> {
        let mut base = Url::parse(&config.endpoint).map_err(|e| BuildError::InvalidEndpoint {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let completions_url = base
            .join("chat/completions")
            .map_err(|e| BuildError::InvalidEndpoint {
                url: config.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            completions_url,
            config,
        })
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Resolved chat completion URL
    #[inline]
    #[must_use]
    pub fn completions_url(&self) -> &Url {
        &self.completions_url
    }
}

#[async_trait::async_trait]
impl NarrativeBackend for HttpNarrativeBackend {
    async fn synthesize(
        &self,
        context: &ProjectContext,
        events: &[NormalizedEvent],
    ) -> Result<RawCandidate, BackendError> {
        let request = NarrativeRequest::build(context, events);
        let user_prompt = request.user_prompt();

        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "timeline",
                    schema: request.output_schema(),
                },
            },
        };

        tracing::debug!(
            url = %self.completions_url,
            model = %self.config.model,
            events = events.len(),
            "calling narrative backend"
        );

        let mut call = self.client.post(self.completions_url.clone()).json(&body);
        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }

        let response = call
            .send()
            .await
            .map_err(|e| BackendError::unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            tracing::warn!(%status, "narrative backend returned error status");
            return Err(BackendError::unavailable(format!("status {status}: {preview}")));
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(format!("invalid completion envelope: {e}")))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::malformed("completion has no message content"))?;

        parse_candidate(&content)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_joins_base_path() {
        let backend = HttpNarrativeBackend::new(
            BackendConfig::new().with_endpoint("http://localhost:8080/v1"),
        )
        .unwrap();
        assert_eq!(
            backend.completions_url().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );

        let backend = HttpNarrativeBackend::new(
            BackendConfig::new().with_endpoint("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(
            backend.completions_url().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let result = HttpNarrativeBackend::new(BackendConfig::new().with_endpoint("not a url"));
        assert!(matches!(result, Err(BuildError::InvalidEndpoint { .. })));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = BackendConfig::new().with_api_key("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

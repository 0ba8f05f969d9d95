//! Messages API backend.
//!
//! The key lives in a [`SecretString`] and is exposed only while the
//! request headers are assembled.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatMessage, Completion, CompletionConfig, LlmProvider, ProviderError, Role};

pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const API_VERSION: &str = "2023-06-01";
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AnthropicProvider {
    api_key: SecretString,
    endpoint: String,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build with an HTTP-level timeout. The regeneration loop applies its
    /// own per-attempt deadline on top of this one.
    pub fn with_timeout(
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout,
            http,
        })
    }

    /// Read the key from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let key = std::env::var(ANTHROPIC_API_KEY_ENV)
            .map_err(|_| ProviderError::MissingCredential(ANTHROPIC_API_KEY_ENV))?;
        Self::new(key)
    }

    /// Point at a proxy or a local mock.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn classify_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.request_timeout)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock<'a>>,
    messages: Vec<Turn<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<Ephemeral>,
}

#[derive(Debug, Serialize)]
struct Ephemeral {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    model: String,
    usage: ResponseUsage,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// System turns go in the top-level `system` field, everything else in `messages`.
fn messages_request<'a>(
    messages: &'a [ChatMessage],
    config: &'a CompletionConfig,
) -> MessagesRequest<'a> {
    let (system, turns): (Vec<_>, Vec<_>) =
        messages.iter().partition(|m| m.role == Role::System);

    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: system
            .into_iter()
            .map(|m| SystemBlock {
                kind: "text",
                text: &m.content,
                cache_control: config.prompt_caching.then_some(Ephemeral { kind: "ephemeral" }),
            })
            .collect(),
        messages: turns
            .into_iter()
            .map(|m| Turn {
                role: m.role,
                content: &m.content,
            })
            .collect(),
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<Completion, ProviderError> {
        let body = messages_request(messages, config);

        let response = self
            .http
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited {
                    retry_after: retry_after(response.headers()),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Unauthorized)
            }
            status if !status.is_success() => {
                let message = match response.json::<ErrorEnvelope>().await {
                    Ok(envelope) => envelope.error.message,
                    Err(e) => e.to_string(),
                };
                tracing::warn!(status = status.as_u16(), %message, "Messages API rejected request");
                return Err(ProviderError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidBody(e.to_string()))?;

        let text: String = parsed.content.into_iter().filter_map(|b| b.text).collect();
        tracing::debug!(
            model = %parsed.model,
            tokens_in = parsed.usage.input_tokens,
            tokens_out = parsed.usage.output_tokens,
            "Messages API call complete"
        );

        Ok(Completion {
            text,
            tokens_in: parsed.usage.input_tokens,
            tokens_out: parsed.usage.output_tokens,
            model: parsed.model,
        })
    }

    fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

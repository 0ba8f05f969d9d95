//! Chat-completion backends for the copy generator.
//!
//! A provider turns a system brief plus a user brief into text.
//! [`crate::generator::ProviderGenerator`] wraps any provider so the
//! regeneration loop only ever sees the [`crate::Generator`] contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, ANTHROPIC_API_KEY_ENV};

/// Failures talking to a completion backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    InvalidBody(String),

    #[error("Provider credentials were refused")]
    Unauthorized,

    #[error("Provider call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),
}

impl ProviderError {
    /// Whether the same call could succeed on another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::InvalidBody(_) => true,
            // 529 is Anthropic's "overloaded"
            ProviderError::Rejected { status, .. } => *status >= 500,
            ProviderError::Unauthorized | ProviderError::MissingCredential(_) => false,
        }
    }
}

/// Model settings for copy generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,

    /// Upper bound on generated tokens per attempt
    pub max_tokens: u32,

    pub temperature: f32,

    /// Mark the system brief as cacheable where the backend supports it
    pub prompt_caching: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250514".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            prompt_caching: true,
        }
    }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text returned by a provider and what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,

    /// Model that served the call, which may differ from the one requested
    pub model: String,
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<Completion, ProviderError>;

    /// Whether credentials are present. Does not make a network call.
    fn is_configured(&self) -> bool;

    /// Provider id recorded on audit entries.
    fn name(&self) -> &str;
}

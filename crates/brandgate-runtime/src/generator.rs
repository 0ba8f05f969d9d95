//! Generator contract and the adapter that turns raw output into candidates.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use brandgate_core::{
    parse_candidate_or_fallback, Candidate, GenerationUsage, ParseDefaults, ParseError, Prompt,
};

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};

/// Raw output of one generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOutput {
    pub text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub provider: String,
    pub model: String,
}

impl GeneratorOutput {
    pub fn usage(&self) -> GenerationUsage {
        GenerationUsage {
            tokens_in: self.tokens_in,
            tokens_out: self.tokens_out,
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

/// Errors from a generation attempt.
///
/// Every variant consumes one attempt of the regeneration budget.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Generator unavailable: {0}")]
    Transient(String),

    #[error("Generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator output could not be parsed: {reason}")]
    Malformed {
        reason: ParseError,
        usage: GenerationUsage,
    },

    #[error("Generator failed: {0}")]
    Fatal(String),
}

impl GeneratorError {
    /// Tokens spent on a call that still failed.
    pub fn usage(&self) -> Option<&GenerationUsage> {
        match self {
            GeneratorError::Malformed { usage, .. } => Some(usage),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, GeneratorError::Fatal(_))
    }
}

impl From<ProviderError> for GeneratorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(d) => GeneratorError::Timeout(d),
            e if e.is_transient() => GeneratorError::Transient(e.to_string()),
            e => GeneratorError::Fatal(e.to_string()),
        }
    }
}

/// Produces raw candidate text from a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<GeneratorOutput, GeneratorError>;

    /// Generator name used in logs.
    fn name(&self) -> &str;
}

/// Generator backed by an [`LlmProvider`].
pub struct ProviderGenerator {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<GeneratorOutput, GeneratorError> {
        let messages = [
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];

        let completion = self.provider.complete(&messages, &self.config).await?;

        Ok(GeneratorOutput {
            text: completion.text,
            tokens_in: completion.tokens_in,
            tokens_out: completion.tokens_out,
            provider: self.provider.name().to_string(),
            model: completion.model,
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

/// A parsed candidate together with the usage of the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCandidate {
    pub candidate: Candidate,
    pub usage: GenerationUsage,
    pub used_fallback: bool,
}

/// Wraps one generator call with a timeout and output normalization.
pub struct GeneratorAdapter {
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl GeneratorAdapter {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Call the generator once and parse its output.
    pub async fn produce(
        &self,
        prompt: &Prompt,
        defaults: &ParseDefaults,
    ) -> Result<GeneratedCandidate, GeneratorError> {
        let output = tokio::time::timeout(self.timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| GeneratorError::Timeout(self.timeout))??;

        let usage = output.usage();

        match parse_candidate_or_fallback(&output.text, defaults) {
            Ok(parsed) => {
                if parsed.used_fallback {
                    tracing::debug!(
                        generator = self.generator.name(),
                        "Generator output was unstructured, used fallback parse"
                    );
                }
                Ok(GeneratedCandidate {
                    candidate: parsed.candidate,
                    usage,
                    used_fallback: parsed.used_fallback,
                })
            }
            Err(reason) => Err(GeneratorError::Malformed { reason, usage }),
        }
    }
}

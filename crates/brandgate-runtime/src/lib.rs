//! # brandgate-runtime
//!
//! Async orchestration around the deterministic `brandgate-core` policy.
//!
//! A request flows through:
//!
//! 1. [`SafetyConfigResolver`]: snapshot of the brand's policy, degrading
//!    to the system default when storage is unavailable
//! 2. [`RegenerationController`]: up to `max_attempts` rounds of
//!    generate, score and gate, one at a time
//! 3. [`AuditLogger`]: one log entry per request, never fatal
//! 4. [`GenerationResponse`](brandgate_core::GenerationResponse): the
//!    caller-visible result
//!
//! Generation, scoring, linting and storage are collaborators behind
//! traits ([`Generator`], [`BrandScorer`], [`ComplianceLinter`],
//! [`SafetyConfigStore`], [`GenerationLogStore`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use brandgate_runtime::{CancelSignal, ContentPipeline, MemoryStore, PipelineConfig};
//!
//! let pipeline = ContentPipeline::builder(PipelineConfig::default())
//!     .generator(generator)
//!     .scorer(scorer)
//!     .linter(linter)
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! let report = pipeline.handle(&body, &CancelSignal::never()).await;
//! println!("{}", serde_json::to_string(&report.response)?);
//! ```

pub mod audit;
pub mod best_effort;
pub mod cancel;
pub mod compliance;
pub mod config;
pub mod controller;
pub mod evaluator;
pub mod generator;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod store;
pub mod usage;

pub use audit::{build_entry, AuditLogger};
pub use best_effort::BestEffort;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use compliance::{AutoFixResult, ComplianceGate, ComplianceLinter, GateResult, LinterError};
pub use config::{ConfigError, PipelineConfig, MAX_CONFIGURABLE_ATTEMPTS};
pub use controller::{ControllerReport, GenerationError, RegenerationController};
pub use evaluator::{BrandScorer, QualityEvaluator, ScorerError};
pub use generator::{
    GeneratedCandidate, Generator, GeneratorAdapter, GeneratorError, GeneratorOutput,
    ProviderGenerator,
};
pub use pipeline::{ContentPipeline, ContentPipelineBuilder, PipelineError, PipelineReport};
pub use providers::{
    ChatMessage, Completion, CompletionConfig, LlmProvider, ProviderError, Role,
};
pub use resolver::SafetyConfigResolver;
pub use store::{
    GenerationLogEntry, GenerationLogStore, LogId, MemoryStore, SafetyConfigStore, StoreError,
    StoredLogEntry,
};
pub use usage::{estimate_cost, RequestUsage};

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, ANTHROPIC_API_KEY_ENV};

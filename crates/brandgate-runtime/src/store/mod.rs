//! Persistence contracts: keyed safety configuration and the append-only
//! generation log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use brandgate_core::{
    BrandSafetyConfig, ComplianceVerdict, OutcomeStatus, QualityVerdict, SafetyMode,
};

mod memory;

pub use memory::MemoryStore;

/// Errors from a persistence backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing table or collection does not exist (yet). Callers
    /// degrade instead of failing.
    #[error("Storage schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Backend(_))
    }
}

/// Identifier of a persisted log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(String);

impl LogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One audit record per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationLogEntry {
    pub brand_id: String,
    pub agent: String,
    pub safety_mode: SafetyMode,

    /// Request input snapshot
    pub input: serde_json::Value,

    /// Candidate returned to the caller; null for blocked, exhausted and failed runs
    pub output: Option<serde_json::Value>,

    pub bfs: Option<QualityVerdict>,
    pub linter: Option<ComplianceVerdict>,

    /// True only for accepted outcomes
    pub approved: bool,

    /// Terminal outcome; `None` when the run ended in an error
    pub status: Option<OutcomeStatus>,

    pub attempts_used: u32,
    pub duration_ms: u64,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub provider: String,
    pub model: String,

    /// Generator calls made, including failed ones
    pub llm_calls: u32,
    pub estimated_cost_usd: f64,

    pub request_id: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A log entry together with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLogEntry {
    pub id: LogId,
    #[serde(flatten)]
    pub entry: GenerationLogEntry,
}

/// Keyed store for per-brand safety configuration.
#[async_trait]
pub trait SafetyConfigStore: Send + Sync {
    /// Load a brand's configuration. `Ok(None)` when the brand has none.
    async fn get_safety_config(
        &self,
        brand_id: &str,
    ) -> Result<Option<BrandSafetyConfig>, StoreError>;

    async fn put_safety_config(
        &self,
        brand_id: &str,
        config: BrandSafetyConfig,
    ) -> Result<(), StoreError>;
}

/// Append-only store for generation log entries.
#[async_trait]
pub trait GenerationLogStore: Send + Sync {
    async fn append(&self, entry: GenerationLogEntry) -> Result<LogId, StoreError>;

    async fn get(&self, id: &LogId) -> Result<StoredLogEntry, StoreError>;

    /// Most recent entries for a brand, newest first.
    async fn list_for_brand(
        &self,
        brand_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredLogEntry>, StoreError>;
}

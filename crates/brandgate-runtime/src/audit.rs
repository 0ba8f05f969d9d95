//! Audit trail: one log entry per request, written best-effort.

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use brandgate_core::{GenerationRequest, SafetyMode};

use crate::best_effort::BestEffort;
use crate::controller::ControllerReport;
use crate::store::{GenerationLogEntry, GenerationLogStore, LogId, StoreError};

/// Writes generation log entries. Failures never reach the caller's result.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn GenerationLogStore>,
    agent: String,
    timeout: Duration,
    retries: usize,
}

impl AuditLogger {
    pub fn new(
        store: Arc<dyn GenerationLogStore>,
        agent: impl Into<String>,
        timeout: Duration,
        retries: usize,
    ) -> Self {
        Self {
            store,
            agent: agent.into(),
            timeout,
            retries,
        }
    }

    /// Persist the entry for a finished run.
    ///
    /// Timeouts and backend errors are retried with exponential backoff; an
    /// unavailable schema is not. The final failure becomes a warning.
    pub async fn record(
        &self,
        request: &GenerationRequest,
        safety_mode: SafetyMode,
        request_id: &str,
        report: &ControllerReport,
    ) -> BestEffort<Option<LogId>> {
        let entry = build_entry(&self.agent, request, safety_mode, request_id, report);
        let store = self.store.clone();
        let timeout = self.timeout;

        let append = || {
            let store = store.clone();
            let entry = entry.clone();
            async move {
                match tokio::time::timeout(timeout, store.append(entry)).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout(timeout)),
                }
            }
        };

        let result = append
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(50))
                    .with_max_delay(Duration::from_secs(1))
                    .with_max_times(self.retries),
            )
            .when(StoreError::is_retryable)
            .notify(|err: &StoreError, delay: Duration| {
                tracing::warn!(error = %err, delay = ?delay, "Retrying audit log write");
            })
            .await;

        match result {
            Ok(id) => {
                tracing::debug!(log_id = %id, request_id, "Audit log written");
                BestEffort::ok(Some(id))
            }
            Err(e) => {
                tracing::error!(
                    brand_id = %request.brand_id,
                    request_id,
                    error = %e,
                    "Failed to write audit log"
                );
                BestEffort::degraded(None, format!("audit log write failed: {}", e))
            }
        }
    }
}

/// Summarize a finished run as a log entry.
pub fn build_entry(
    agent: &str,
    request: &GenerationRequest,
    safety_mode: SafetyMode,
    request_id: &str,
    report: &ControllerReport,
) -> GenerationLogEntry {
    let input = serde_json::to_value(&request.input).unwrap_or(serde_json::Value::Null);

    let (output, bfs, linter, approved, status, error) = match &report.result {
        Ok(outcome) => (
            outcome
                .candidate()
                .and_then(|candidate| serde_json::to_value(candidate).ok()),
            outcome.quality().cloned(),
            outcome.compliance().cloned(),
            outcome.is_approved(),
            Some(outcome.status()),
            outcome.error_message(),
        ),
        Err(e) => (None, None, None, false, None, Some(e.to_string())),
    };

    GenerationLogEntry {
        brand_id: request.brand_id.clone(),
        agent: agent.to_string(),
        safety_mode,
        input,
        output,
        bfs,
        linter,
        approved,
        status,
        attempts_used: report.attempts_used,
        duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        tokens_in: report.usage.tokens_in,
        tokens_out: report.usage.tokens_out,
        provider: report.usage.provider.clone(),
        model: report.usage.model.clone(),
        llm_calls: report.usage.llm_calls,
        estimated_cost_usd: report.usage.estimated_cost_usd,
        request_id: request_id.to_string(),
        error,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::GenerationError;
    use crate::store::{MemoryStore, StoredLogEntry};
    use crate::usage::RequestUsage;
    use async_trait::async_trait;
    use brandgate_core::{
        Candidate, ComplianceVerdict, ContentInput, GenerationOutcome, OutcomeStatus, Platform,
        QualityVerdict,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    fn request() -> GenerationRequest {
        GenerationRequest {
            brand_id: "acme".to_string(),
            input: ContentInput {
                topic: "Launch".to_string(),
                platform: Platform::Linkedin,
                tone: "confident".to_string(),
                format: "post".to_string(),
                max_length: Some(500),
                include_cta: true,
                cta_type: None,
            },
            safety_mode: None,
        }
    }

    fn report(result: Result<GenerationOutcome, GenerationError>) -> ControllerReport {
        ControllerReport {
            result,
            attempts_used: 2,
            duration: Duration::from_millis(1500),
            usage: RequestUsage {
                tokens_in: 300,
                tokens_out: 120,
                llm_calls: 2,
                provider: "anthropic".to_string(),
                model: "claude-sonnet-4-5".to_string(),
                estimated_cost_usd: 0.0027,
            },
            warnings: Vec::new(),
        }
    }

    fn blocked() -> GenerationOutcome {
        let mut compliance = ComplianceVerdict {
            blocked: true,
            ..ComplianceVerdict::default()
        };
        compliance.violations.profanity.push("****".to_string());
        GenerationOutcome::Blocked {
            quality: QualityVerdict::uniform(0.8, true),
            compliance,
        }
    }

    struct FlakyLogStore {
        failures_left: AtomicU32,
        error: fn() -> StoreError,
        calls: AtomicU32,
        inner: MemoryStore,
    }

    impl FlakyLogStore {
        fn new(failures: u32, error: fn() -> StoreError) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                error,
                calls: AtomicU32::new(0),
                inner: MemoryStore::new(),
            }
        }
    }

    #[async_trait]
    impl GenerationLogStore for FlakyLogStore {
        async fn append(&self, entry: GenerationLogEntry) -> Result<LogId, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err((self.error)());
            }
            self.inner.append(entry).await
        }

        async fn get(&self, id: &LogId) -> Result<StoredLogEntry, StoreError> {
            self.inner.get(id).await
        }

        async fn list_for_brand(
            &self,
            brand_id: &str,
            limit: usize,
        ) -> Result<Vec<StoredLogEntry>, StoreError> {
            self.inner.list_for_brand(brand_id, limit).await
        }
    }

    #[test]
    fn test_accepted_entry() {
        let outcome = GenerationOutcome::Accepted {
            candidate: Candidate::new("H", "B", "C", vec!["#x".to_string()]),
            quality: QualityVerdict::uniform(0.9, true),
            compliance: ComplianceVerdict::clean(),
        };
        let entry = build_entry("content", &request(), SafetyMode::Safe, "req-1", &report(Ok(outcome)));

        assert!(entry.approved);
        assert_eq!(entry.status, Some(OutcomeStatus::Accepted));
        assert_eq!(entry.output.as_ref().unwrap()["headline"], "H");
        assert_eq!(entry.input["topic"], "Launch");
        assert_eq!(entry.duration_ms, 1500);
        assert_eq!(entry.tokens_in + entry.tokens_out, 420);
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_blocked_entry_keeps_verdicts_not_output() {
        let entry = build_entry("content", &request(), SafetyMode::Safe, "req-2", &report(Ok(blocked())));

        assert!(!entry.approved);
        assert!(entry.output.is_none());
        assert!(entry.linter.unwrap().blocked);
        assert_eq!(
            entry.error.as_deref(),
            Some("Content blocked by safety filters: profanity(1)")
        );
    }

    #[test]
    fn test_failed_run_entry() {
        let entry = build_entry(
            "content",
            &request(),
            SafetyMode::Balanced,
            "req-3",
            &report(Err(GenerationError::Cancelled)),
        );
        assert!(entry.status.is_none());
        assert_eq!(entry.error.as_deref(), Some("Request cancelled"));
        assert_eq!(entry.safety_mode, SafetyMode::Balanced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(FlakyLogStore::new(2, || {
            StoreError::Backend(anyhow::anyhow!("connection reset"))
        }));
        let logger = AuditLogger::new(store.clone(), "content", Duration::from_secs(5), 2);

        let written = logger
            .record(&request(), SafetyMode::Safe, "req-4", &report(Ok(blocked())))
            .await;

        assert!(!written.is_degraded());
        let id = written.value.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get(&id).await.unwrap().entry.request_id, "req-4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_unavailable_not_retried() {
        let store = Arc::new(FlakyLogStore::new(5, || {
            StoreError::SchemaUnavailable("generation_logs".to_string())
        }));
        let logger = AuditLogger::new(store.clone(), "content", Duration::from_secs(5), 2);

        let written = logger
            .record(&request(), SafetyMode::Safe, "req-5", &report(Ok(blocked())))
            .await;

        assert!(written.value.is_none());
        assert!(written.warnings[0].contains("audit log write failed"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_warning() {
        let store = Arc::new(FlakyLogStore::new(10, || {
            StoreError::Backend(anyhow::anyhow!("disk full"))
        }));
        let logger = AuditLogger::new(store.clone(), "content", Duration::from_secs(5), 2);

        let written = logger
            .record(&request(), SafetyMode::Safe, "req-6", &report(Ok(blocked())))
            .await;

        assert!(written.value.is_none());
        assert!(written.warnings[0].contains("disk full"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }
}

//! In-process store used by tests and the CLI.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use brandgate_core::BrandSafetyConfig;

use super::{
    GenerationLogEntry, GenerationLogStore, LogId, SafetyConfigStore, StoreError, StoredLogEntry,
};

/// Both stores backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    configs: RwLock<HashMap<String, BrandSafetyConfig>>,
    logs: RwLock<Vec<StoredLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a brand configuration.
    pub fn with_safety_config(self, brand_id: impl Into<String>, config: BrandSafetyConfig) -> Self {
        self.configs.write().insert(brand_id.into(), config);
        self
    }

    /// Number of log entries written.
    pub fn log_count(&self) -> usize {
        self.logs.read().len()
    }
}

#[async_trait]
impl SafetyConfigStore for MemoryStore {
    async fn get_safety_config(
        &self,
        brand_id: &str,
    ) -> Result<Option<BrandSafetyConfig>, StoreError> {
        Ok(self.configs.read().get(brand_id).cloned())
    }

    async fn put_safety_config(
        &self,
        brand_id: &str,
        config: BrandSafetyConfig,
    ) -> Result<(), StoreError> {
        self.configs.write().insert(brand_id.to_string(), config);
        Ok(())
    }
}

#[async_trait]
impl GenerationLogStore for MemoryStore {
    async fn append(&self, entry: GenerationLogEntry) -> Result<LogId, StoreError> {
        let id = LogId::generate();
        self.logs.write().push(StoredLogEntry {
            id: id.clone(),
            entry,
        });
        Ok(id)
    }

    async fn get(&self, id: &LogId) -> Result<StoredLogEntry, StoreError> {
        self.logs
            .read()
            .iter()
            .find(|stored| &stored.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("log entry {}", id)))
    }

    async fn list_for_brand(
        &self,
        brand_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredLogEntry>, StoreError> {
        Ok(self
            .logs
            .read()
            .iter()
            .rev()
            .filter(|stored| stored.entry.brand_id == brand_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandgate_core::SafetyMode;
    use chrono::Utc;

    fn entry(brand_id: &str, request_id: &str) -> GenerationLogEntry {
        GenerationLogEntry {
            brand_id: brand_id.to_string(),
            agent: "content".to_string(),
            safety_mode: SafetyMode::Safe,
            input: serde_json::json!({"topic": "launch"}),
            output: None,
            bfs: None,
            linter: None,
            approved: false,
            status: None,
            attempts_used: 1,
            duration_ms: 12,
            tokens_in: 0,
            tokens_out: 0,
            provider: String::new(),
            model: String::new(),
            llm_calls: 1,
            estimated_cost_usd: 0.0,
            request_id: request_id.to_string(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_safety_config_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get_safety_config("acme").await.unwrap().is_none());

        let config = BrandSafetyConfig::system_default().with_mode(SafetyMode::Relaxed);
        store.put_safety_config("acme", config.clone()).await.unwrap();
        assert_eq!(store.get_safety_config("acme").await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn test_list_for_brand_newest_first() {
        let store = MemoryStore::new();
        store.append(entry("acme", "r1")).await.unwrap();
        store.append(entry("other", "r2")).await.unwrap();
        let last = store.append(entry("acme", "r3")).await.unwrap();

        let listed = store.list_for_brand("acme", 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, last);
        assert_eq!(listed[0].entry.request_id, "r3");

        assert_eq!(store.list_for_brand("acme", 1).await.unwrap().len(), 1);
        assert_eq!(store.log_count(), 3);
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let store = MemoryStore::new();
        let err = store.get(&LogId::new("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}

//! Per-request safety configuration with a fallback to system defaults.

use std::sync::Arc;
use std::time::Duration;

use brandgate_core::{BrandSafetyConfig, SafetyMode};

use crate::best_effort::BestEffort;
use crate::store::{SafetyConfigStore, StoreError};

/// Loads the safety configuration snapshot for one request.
#[derive(Clone)]
pub struct SafetyConfigResolver {
    store: Arc<dyn SafetyConfigStore>,
    default: BrandSafetyConfig,
    timeout: Duration,
}

impl SafetyConfigResolver {
    pub fn new(
        store: Arc<dyn SafetyConfigStore>,
        default: BrandSafetyConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            default,
            timeout,
        }
    }

    /// Resolve the effective configuration for a brand.
    ///
    /// Mode priority is: `requested`, then the brand's stored mode, then the
    /// system default. An unavailable schema or a timed-out load degrades to
    /// the default configuration with a warning. Any other store error is
    /// returned.
    pub async fn resolve(
        &self,
        brand_id: &str,
        requested: Option<SafetyMode>,
    ) -> Result<BestEffort<BrandSafetyConfig>, StoreError> {
        let loaded = match tokio::time::timeout(self.timeout, self.store.get_safety_config(brand_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        let resolved = match loaded {
            Ok(Some(config)) => BestEffort::ok(config),
            Ok(None) => {
                tracing::debug!(brand_id, "No stored safety config, using system default");
                BestEffort::ok(self.default.clone())
            }
            Err(e @ (StoreError::SchemaUnavailable(_) | StoreError::Timeout(_))) => {
                tracing::warn!(
                    brand_id,
                    error = %e,
                    "Safety config storage degraded, falling back to system default"
                );
                BestEffort::degraded(
                    self.default.clone(),
                    format!("safety config fallback: {}", e),
                )
            }
            Err(e) => return Err(e),
        };

        Ok(resolved.map(|config| match requested {
            Some(mode) => config.with_mode(mode),
            None => config,
        }))
    }
}

//! Request entry point: validate, resolve, run, audit, respond.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use brandgate_core::{
    validate_request, ErrorCode, GenerationRequest, GenerationResponse, ValidationError,
};

use crate::audit::AuditLogger;
use crate::cancel::CancelSignal;
use crate::compliance::ComplianceLinter;
use crate::config::{ConfigError, PipelineConfig};
use crate::controller::{ControllerReport, GenerationError, RegenerationController};
use crate::evaluator::BrandScorer;
use crate::generator::Generator;
use crate::resolver::SafetyConfigResolver;
use crate::store::{GenerationLogStore, SafetyConfigStore};
use crate::usage::RequestUsage;

/// Errors from assembling a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Pipeline is missing a {0}")]
    MissingComponent(&'static str),
}

/// The caller-visible response plus side-channel warnings.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub response: GenerationResponse,

    /// Degradations that did not change the response
    pub warnings: Vec<String>,

    /// Empty when the request was rejected before a run started
    pub request_id: String,

    pub attempts_used: u32,
}

/// Content generation behind the quality gate.
pub struct ContentPipeline {
    resolver: SafetyConfigResolver,
    controller: RegenerationController,
    audit: AuditLogger,
    config: PipelineConfig,
}

impl ContentPipeline {
    pub fn builder(config: PipelineConfig) -> ContentPipelineBuilder {
        ContentPipelineBuilder {
            config,
            generator: None,
            scorer: None,
            linter: None,
            config_store: None,
            log_store: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle a raw JSON request body.
    pub async fn handle(&self, body: &serde_json::Value, cancel: &CancelSignal) -> PipelineReport {
        match validate_request(body) {
            Ok(request) => self.handle_request(&request, cancel).await,
            Err(ValidationError::Invalid(errors)) => {
                tracing::info!(errors = errors.len(), "Rejected invalid request");
                PipelineReport {
                    response: GenerationResponse::validation(errors),
                    warnings: Vec::new(),
                    request_id: String::new(),
                    attempts_used: 0,
                }
            }
            Err(e @ ValidationError::Schema(_)) => {
                tracing::error!(error = %e, "Request schema unavailable");
                PipelineReport {
                    response: GenerationResponse::failure(ErrorCode::Internal, e.to_string(), None),
                    warnings: Vec::new(),
                    request_id: String::new(),
                    attempts_used: 0,
                }
            }
        }
    }

    /// Handle an already validated request.
    pub async fn handle_request(
        &self,
        request: &GenerationRequest,
        cancel: &CancelSignal,
    ) -> PipelineReport {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut warnings = Vec::new();

        let resolved = self
            .resolver
            .resolve(&request.brand_id, request.safety_mode)
            .await;

        let (safety_mode, report) = match resolved {
            Ok(safety) => {
                let safety = safety.drain_into(&mut warnings);
                let report = self.controller.run(request, &safety, cancel).await;
                (safety.safety_mode, report)
            }
            Err(e) => {
                tracing::error!(brand_id = %request.brand_id, error = %e, "Failed to load safety config");
                let mode = request
                    .safety_mode
                    .unwrap_or(self.config.default_safety.safety_mode);
                let report = ControllerReport {
                    result: Err(GenerationError::SafetyConfig(e.to_string())),
                    attempts_used: 0,
                    duration: Duration::ZERO,
                    usage: RequestUsage::default(),
                    warnings: Vec::new(),
                };
                (mode, report)
            }
        };

        warnings.extend(report.warnings.iter().cloned());

        let log_id = self
            .audit
            .record(request, safety_mode, &request_id, &report)
            .await
            .drain_into(&mut warnings)
            .map(|id| id.to_string());

        let response = match &report.result {
            Ok(outcome) => {
                tracing::info!(
                    brand_id = %request.brand_id,
                    request_id = %request_id,
                    status = %outcome.status(),
                    attempts = report.attempts_used,
                    duration_ms = report.duration.as_millis() as u64,
                    tokens = report.usage.total_tokens(),
                    "Generation finished"
                );
                GenerationResponse::from_outcome(outcome, log_id)
            }
            Err(e) => {
                tracing::warn!(
                    brand_id = %request.brand_id,
                    request_id = %request_id,
                    attempts = report.attempts_used,
                    error = %e,
                    "Generation failed"
                );
                GenerationResponse::failure(ErrorCode::Internal, e.to_string(), log_id)
            }
        };

        PipelineReport {
            response,
            warnings,
            request_id,
            attempts_used: report.attempts_used,
        }
    }
}

/// Assembles a [`ContentPipeline`] from its collaborators.
pub struct ContentPipelineBuilder {
    config: PipelineConfig,
    generator: Option<Arc<dyn Generator>>,
    scorer: Option<Arc<dyn BrandScorer>>,
    linter: Option<Arc<dyn ComplianceLinter>>,
    config_store: Option<Arc<dyn SafetyConfigStore>>,
    log_store: Option<Arc<dyn GenerationLogStore>>,
}

impl ContentPipelineBuilder {
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn BrandScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn linter(mut self, linter: Arc<dyn ComplianceLinter>) -> Self {
        self.linter = Some(linter);
        self
    }

    pub fn config_store(mut self, store: Arc<dyn SafetyConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn log_store(mut self, store: Arc<dyn GenerationLogStore>) -> Self {
        self.log_store = Some(store);
        self
    }

    /// Use one backend for both stores.
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: SafetyConfigStore + GenerationLogStore + 'static,
    {
        self.config_store(store.clone()).log_store(store)
    }

    pub fn build(self) -> Result<ContentPipeline, PipelineError> {
        self.config.validate()?;

        let generator = self.generator.ok_or(PipelineError::MissingComponent("generator"))?;
        let scorer = self.scorer.ok_or(PipelineError::MissingComponent("scorer"))?;
        let linter = self.linter.ok_or(PipelineError::MissingComponent("linter"))?;
        let config_store = self
            .config_store
            .ok_or(PipelineError::MissingComponent("safety config store"))?;
        let log_store = self
            .log_store
            .ok_or(PipelineError::MissingComponent("generation log store"))?;

        let config = self.config;
        Ok(ContentPipeline {
            resolver: SafetyConfigResolver::new(
                config_store,
                config.default_safety.clone(),
                config.store_timeout,
            ),
            controller: RegenerationController::new(generator, scorer, linter, &config),
            audit: AuditLogger::new(
                log_store,
                config.agent.clone(),
                config.store_timeout,
                config.audit_retries,
            ),
            config,
        })
    }
}

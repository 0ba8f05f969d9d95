//! Compliance gate: lint, then best-effort auto-fix.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use brandgate_core::{merge_fixes, AppliedFix, BrandSafetyConfig, Candidate, ComplianceVerdict};

/// Errors from the compliance linter.
#[derive(Error, Debug)]
pub enum LinterError {
    #[error("Linter unavailable: {0}")]
    Unavailable(String),

    #[error("Auto-fix failed: {0}")]
    AutoFix(String),
}

/// Result of an auto-fix run.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFixResult {
    pub candidate: Candidate,
    pub fixes_applied: Vec<AppliedFix>,
}

/// Compliance linter contract.
#[async_trait]
pub trait ComplianceLinter: Send + Sync {
    async fn lint(
        &self,
        candidate: &Candidate,
        safety: &BrandSafetyConfig,
    ) -> Result<ComplianceVerdict, LinterError>;

    async fn auto_fix(
        &self,
        candidate: &Candidate,
        verdict: &ComplianceVerdict,
        safety: &BrandSafetyConfig,
    ) -> Result<AutoFixResult, LinterError>;
}

/// What the gate decided about a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    /// Hard stop; the candidate must not leave the loop.
    Blocked(ComplianceVerdict),

    /// Not blocked. The candidate may carry merged fixes.
    Cleared {
        candidate: Candidate,
        compliance: ComplianceVerdict,
        /// Set when auto-fix was attempted and failed
        warning: Option<String>,
    },
}

/// Runs the linter and, when useful, the auto-fixer.
#[derive(Clone)]
pub struct ComplianceGate {
    linter: Arc<dyn ComplianceLinter>,
}

impl ComplianceGate {
    pub fn new(linter: Arc<dyn ComplianceLinter>) -> Self {
        Self { linter }
    }

    /// Gate a raw candidate.
    ///
    /// Only fields named by applied fixes are merged back, so a fixer that
    /// rewrites more than it reports cannot change untouched fields.
    pub async fn check(
        &self,
        candidate: Candidate,
        safety: &BrandSafetyConfig,
    ) -> Result<GateResult, LinterError> {
        let mut verdict = self.linter.lint(&candidate, safety).await?;
        // Fixes only count when this gate applied them
        verdict.fixes_applied.clear();

        if verdict.blocked {
            return Ok(GateResult::Blocked(verdict));
        }

        if !verdict.wants_auto_fix() {
            return Ok(GateResult::Cleared {
                candidate,
                compliance: verdict,
                warning: None,
            });
        }

        match self.linter.auto_fix(&candidate, &verdict, safety).await {
            Ok(fixed) => {
                let merged = merge_fixes(&candidate, &fixed.candidate, &fixed.fixes_applied);
                tracing::debug!(fixes = fixed.fixes_applied.len(), "Auto-fix applied");
                verdict.fixes_applied = fixed.fixes_applied;
                Ok(GateResult::Cleared {
                    candidate: merged,
                    compliance: verdict,
                    warning: None,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auto-fix failed, keeping unfixed candidate");
                Ok(GateResult::Cleared {
                    candidate,
                    compliance: verdict,
                    warning: Some(format!("auto-fix failed: {}", e)),
                })
            }
        }
    }
}

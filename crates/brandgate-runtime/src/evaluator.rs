//! Quality evaluation through the brand-fidelity scorer.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use brandgate_core::{BrandVoice, Candidate, QualityVerdict};

/// Errors from the brand-fidelity scorer.
#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scorer returned an invalid score: {0}")]
    InvalidScore(f64),
}

/// Brand-fidelity scorer contract.
#[async_trait]
pub trait BrandScorer: Send + Sync {
    async fn score(
        &self,
        candidate: &Candidate,
        voice: &BrandVoice,
    ) -> Result<QualityVerdict, ScorerError>;
}

/// Invokes the scorer and normalizes its verdict.
#[derive(Clone)]
pub struct QualityEvaluator {
    scorer: Arc<dyn BrandScorer>,
}

impl QualityEvaluator {
    pub fn new(scorer: Arc<dyn BrandScorer>) -> Self {
        Self { scorer }
    }

    /// Score a raw candidate.
    ///
    /// Scores are clamped to `0.0..=1.0`. A non-finite overall score is
    /// rejected since no decision can be made from it.
    pub async fn evaluate(
        &self,
        candidate: &Candidate,
        voice: &BrandVoice,
    ) -> Result<QualityVerdict, ScorerError> {
        let mut verdict = self.scorer.score(candidate, voice).await?;

        if !verdict.score.is_finite() {
            return Err(ScorerError::InvalidScore(verdict.score));
        }

        verdict.score = clamp_unit(verdict.score);
        let subs = &mut verdict.sub_scores;
        for value in [
            &mut subs.tone_alignment,
            &mut subs.terminology_match,
            &mut subs.compliance,
            &mut subs.cta_fit,
            &mut subs.platform_fit,
        ] {
            *value = clamp_unit(*value);
        }

        Ok(verdict)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

//! Terminal results of the regeneration loop.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::Candidate;
use crate::types::GenerationUsage;
use crate::verdict::{ComplianceVerdict, QualityVerdict};

/// Everything known about one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    pub candidate: Candidate,
    pub quality: QualityVerdict,
    pub compliance: ComplianceVerdict,
    pub usage: GenerationUsage,
}

/// Terminal result of the loop.
///
/// `Blocked` and `Exhausted` never carry a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Accepted {
        candidate: Candidate,
        quality: QualityVerdict,
        compliance: ComplianceVerdict,
    },
    NeedsReview {
        candidate: Candidate,
        quality: QualityVerdict,
        compliance: ComplianceVerdict,
    },
    Blocked {
        quality: QualityVerdict,
        compliance: ComplianceVerdict,
    },
    Exhausted {
        /// Verdicts of the last evaluated attempt, kept for the audit trail
        last_quality: Option<QualityVerdict>,
        last_compliance: Option<ComplianceVerdict>,
    },
}

/// Outcome class without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Accepted,
    NeedsReview,
    Blocked,
    Exhausted,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeStatus::Accepted => "accepted",
            OutcomeStatus::NeedsReview => "needs_review",
            OutcomeStatus::Blocked => "blocked",
            OutcomeStatus::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Caller-visible message for a blocked request.
pub const BLOCKED_MESSAGE: &str = "Content blocked by safety filters";

/// Caller-visible message for an exhausted attempt budget.
pub const EXHAUSTED_MESSAGE: &str = "Failed to generate acceptable content after multiple attempts";

impl GenerationOutcome {
    /// Build the accepted or needs-review outcome from an attempt.
    pub fn accepted(record: AttemptRecord) -> Self {
        Self::Accepted {
            candidate: record.candidate,
            quality: record.quality,
            compliance: record.compliance,
        }
    }

    pub fn needs_review(record: AttemptRecord) -> Self {
        Self::NeedsReview {
            candidate: record.candidate,
            quality: record.quality,
            compliance: record.compliance,
        }
    }

    /// Build the blocked outcome, dropping the candidate.
    pub fn blocked(record: AttemptRecord) -> Self {
        Self::Blocked {
            quality: record.quality,
            compliance: record.compliance,
        }
    }

    pub fn exhausted(last: Option<&AttemptRecord>) -> Self {
        Self::Exhausted {
            last_quality: last.map(|r| r.quality.clone()),
            last_compliance: last.map(|r| r.compliance.clone()),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Accepted { .. } => OutcomeStatus::Accepted,
            Self::NeedsReview { .. } => OutcomeStatus::NeedsReview,
            Self::Blocked { .. } => OutcomeStatus::Blocked,
            Self::Exhausted { .. } => OutcomeStatus::Exhausted,
        }
    }

    /// Only accepted content counts as approved.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The candidate exposed to the caller, if any.
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Accepted { candidate, .. } | Self::NeedsReview { candidate, .. } => {
                Some(candidate)
            }
            Self::Blocked { .. } | Self::Exhausted { .. } => None,
        }
    }

    pub fn quality(&self) -> Option<&QualityVerdict> {
        match self {
            Self::Accepted { quality, .. }
            | Self::NeedsReview { quality, .. }
            | Self::Blocked { quality, .. } => Some(quality),
            Self::Exhausted { last_quality, .. } => last_quality.as_ref(),
        }
    }

    pub fn compliance(&self) -> Option<&ComplianceVerdict> {
        match self {
            Self::Accepted { compliance, .. }
            | Self::NeedsReview { compliance, .. }
            | Self::Blocked { compliance, .. } => Some(compliance),
            Self::Exhausted {
                last_compliance, ..
            } => last_compliance.as_ref(),
        }
    }

    /// Failure reason for blocked and exhausted outcomes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Blocked { compliance, .. } => {
                let summary = compliance.violations.summary();
                if summary.is_empty() {
                    Some(BLOCKED_MESSAGE.to_string())
                } else {
                    Some(format!("{}: {}", BLOCKED_MESSAGE, summary))
                }
            }
            Self::Exhausted { .. } => Some(EXHAUSTED_MESSAGE.to_string()),
            Self::Accepted { .. } | Self::NeedsReview { .. } => None,
        }
    }
}

//! Acceptance, escalation and retry policy.
//!
//! The decision for one attempt is evaluated in a fixed priority order:
//! 1. Compliance `blocked` → BLOCK (dominates every other signal)
//! 2. Quality passed AND (compliance passed OR a fix was applied) → ACCEPT
//! 3. Compliance `needs_human_review` → REVIEW
//! 4. Attempts remain → RETRY, otherwise → EXHAUST
//!
//! These rules are not configurable. Only the attempt budget is.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::verdict::{ComplianceVerdict, QualityVerdict};

/// Default regeneration budget.
pub const MAX_REGENERATION_ATTEMPTS: u32 = 3;

/// What to do after an attempt has been generated, scored and gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Block,
    Accept,
    Review,
    Retry,
    Exhaust,
}

/// Whether a verdict pair satisfies the acceptance rule.
pub fn is_acceptable(quality: &QualityVerdict, compliance: &ComplianceVerdict) -> bool {
    !compliance.blocked
        && quality.passed
        && (compliance.passed || compliance.has_fixes_applied())
}

/// Decide the next step for an attempt.
///
/// `attempts_remaining` counts attempts still available after this one.
pub fn decide(
    quality: &QualityVerdict,
    compliance: &ComplianceVerdict,
    attempts_remaining: u32,
) -> Decision {
    if compliance.blocked {
        return Decision::Block;
    }

    if is_acceptable(quality, compliance) {
        return Decision::Accept;
    }

    if compliance.needs_human_review {
        return Decision::Review;
    }

    if attempts_remaining > 0 {
        Decision::Retry
    } else {
        Decision::Exhaust
    }
}

/// Phase of the regeneration loop, used for tracing and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Pending,
    Generating,
    Evaluating,
    Gating,
    Retry,
    Accepted,
    NeedsReview,
    Blocked,
    Exhausted,
    Failed,
}

impl AttemptPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptPhase::Accepted
                | AttemptPhase::NeedsReview
                | AttemptPhase::Blocked
                | AttemptPhase::Exhausted
                | AttemptPhase::Failed
        )
    }
}

impl From<Decision> for AttemptPhase {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Block => AttemptPhase::Blocked,
            Decision::Accept => AttemptPhase::Accepted,
            Decision::Review => AttemptPhase::NeedsReview,
            Decision::Retry => AttemptPhase::Retry,
            Decision::Exhaust => AttemptPhase::Exhausted,
        }
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptPhase::Pending => "pending",
            AttemptPhase::Generating => "generating",
            AttemptPhase::Evaluating => "evaluating",
            AttemptPhase::Gating => "gating",
            AttemptPhase::Retry => "retry",
            AttemptPhase::Accepted => "accepted",
            AttemptPhase::NeedsReview => "needs_review",
            AttemptPhase::Blocked => "blocked",
            AttemptPhase::Exhausted => "exhausted",
            AttemptPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

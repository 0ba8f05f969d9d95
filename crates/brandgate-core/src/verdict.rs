//! Verdicts returned by the brand-fidelity scorer and the compliance linter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::CandidateField;

/// Sub-scores making up the Brand Fidelity Score, each in `0.0..=1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub tone_alignment: f64,
    pub terminology_match: f64,
    pub compliance: f64,
    pub cta_fit: f64,
    pub platform_fit: f64,
}

/// Scorer output for one candidate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Overall Brand Fidelity Score
    pub score: f64,

    pub sub_scores: SubScores,

    pub passed: bool,

    #[serde(default)]
    pub issues: Vec<String>,
}

impl QualityVerdict {
    /// A verdict with uniform sub-scores, mostly useful for fixtures.
    pub fn uniform(score: f64, passed: bool) -> Self {
        Self {
            score,
            sub_scores: SubScores {
                tone_alignment: score,
                terminology_match: score,
                compliance: score,
                cta_fit: score,
                platform_fit: score,
            },
            passed,
            issues: Vec::new(),
        }
    }
}

/// Violation categories the linter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Profanity,
    BannedPhrase,
    BannedClaim,
    MissingDisclaimer,
    MissingHashtag,
    Platform,
    Pii,
    CompetitorMention,
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationCategory::Profanity => "profanity",
            ViolationCategory::BannedPhrase => "banned_phrase",
            ViolationCategory::BannedClaim => "banned_claim",
            ViolationCategory::MissingDisclaimer => "missing_disclaimer",
            ViolationCategory::MissingHashtag => "missing_hashtag",
            ViolationCategory::Platform => "platform",
            ViolationCategory::Pii => "pii",
            ViolationCategory::CompetitorMention => "competitor_mention",
        };
        f.write_str(name)
    }
}

/// Policy hits grouped by category. Each entry is the offending text or rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violations {
    #[serde(default)]
    pub profanity: Vec<String>,
    #[serde(default)]
    pub banned_phrases: Vec<String>,
    #[serde(default)]
    pub banned_claims: Vec<String>,
    #[serde(default)]
    pub missing_disclaimers: Vec<String>,
    #[serde(default)]
    pub missing_hashtags: Vec<String>,
    #[serde(default)]
    pub platform: Vec<String>,
    #[serde(default)]
    pub pii: Vec<String>,
    #[serde(default)]
    pub competitor_mentions: Vec<String>,
}

impl Violations {
    fn by_category(&self) -> [(ViolationCategory, &Vec<String>); 8] {
        [
            (ViolationCategory::Profanity, &self.profanity),
            (ViolationCategory::BannedPhrase, &self.banned_phrases),
            (ViolationCategory::BannedClaim, &self.banned_claims),
            (ViolationCategory::MissingDisclaimer, &self.missing_disclaimers),
            (ViolationCategory::MissingHashtag, &self.missing_hashtags),
            (ViolationCategory::Platform, &self.platform),
            (ViolationCategory::Pii, &self.pii),
            (ViolationCategory::CompetitorMention, &self.competitor_mentions),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn count(&self) -> usize {
        self.by_category().iter().map(|(_, hits)| hits.len()).sum()
    }

    /// Categories with at least one hit, in declaration order.
    pub fn categories(&self) -> Vec<ViolationCategory> {
        self.by_category()
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(category, _)| *category)
            .collect()
    }

    /// Compact one-line description, e.g. `"pii(1), banned_phrase(2)"`.
    pub fn summary(&self) -> String {
        self.by_category()
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(category, hits)| format!("{}({})", category, hits.len()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Kind of mechanical remediation performed by auto-fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    InsertedDisclaimer,
    AppendedHashtag,
    RemovedBannedPhrase,
    ReplacedClaim,
    Truncated,
    Other,
}

/// One fix actually applied to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFix {
    pub field: CandidateField,
    pub kind: FixKind,
    pub description: String,
}

/// Linter output for one candidate.
///
/// `blocked` is a hard stop and is independent of `passed`.
/// `fixes_applied` is only populated after auto-fix runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub passed: bool,

    pub blocked: bool,

    pub needs_human_review: bool,

    #[serde(default)]
    pub violations: Violations,

    /// Whether the linter believes auto-fix can remediate the violations
    #[serde(default)]
    pub fixable: bool,

    #[serde(default)]
    pub fixes_applied: Vec<AppliedFix>,
}

impl ComplianceVerdict {
    /// A clean verdict with no violations.
    pub fn clean() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    pub fn has_fixes_applied(&self) -> bool {
        !self.fixes_applied.is_empty()
    }

    /// Whether the gate should invoke auto-fix for this verdict.
    pub fn wants_auto_fix(&self) -> bool {
        !self.blocked && !self.passed && self.fixable
    }
}

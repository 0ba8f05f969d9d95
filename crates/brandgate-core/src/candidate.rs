//! The working draft produced by one generator call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::verdict::AppliedFix;

/// A field of a [`Candidate`] that auto-fix may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateField {
    Headline,
    Body,
    Cta,
    Hashtags,
}

/// Candidate copy for a single attempt.
///
/// `char_count` is derived; every constructor and mutation recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub headline: String,
    pub body: String,
    pub cta: String,
    pub hashtags: Vec<String>,
    pub char_count: usize,
}

impl Candidate {
    pub fn new(
        headline: impl Into<String>,
        body: impl Into<String>,
        cta: impl Into<String>,
        hashtags: Vec<String>,
    ) -> Self {
        let mut candidate = Self {
            headline: headline.into(),
            body: body.into(),
            cta: cta.into(),
            hashtags: hashtags.into_iter().map(normalize_hashtag).collect(),
            char_count: 0,
        };
        candidate.recount();
        candidate
    }

    /// Recompute `char_count` from the visible fields.
    pub fn recount(&mut self) {
        self.char_count = self.full_text().chars().count();
    }

    /// The copy as it would be published: headline, body, CTA, hashtags.
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        for part in [&self.headline, &self.body, &self.cta] {
            if !part.trim().is_empty() {
                parts.push(part.as_str());
            }
        }
        let tags = self.hashtags.join(" ");
        if !tags.is_empty() {
            parts.push(tags.as_str());
        }
        parts.join("\n\n")
    }

    /// Take `field` from `other`.
    fn copy_field(&mut self, other: &Candidate, field: CandidateField) {
        match field {
            CandidateField::Headline => self.headline = other.headline.clone(),
            CandidateField::Body => self.body = other.body.clone(),
            CandidateField::Cta => self.cta = other.cta.clone(),
            CandidateField::Hashtags => self.hashtags = other.hashtags.clone(),
        }
    }
}

/// Merge an auto-fixed candidate back into the original.
///
/// Only fields named by at least one applied fix are taken from `fixed`;
/// every other field keeps the original text. With no fixes the original
/// is returned unchanged.
pub fn merge_fixes(original: &Candidate, fixed: &Candidate, fixes: &[AppliedFix]) -> Candidate {
    let touched: BTreeSet<CandidateField> = fixes.iter().map(|f| f.field).collect();

    let mut merged = original.clone();
    for field in touched {
        merged.copy_field(fixed, field);
    }
    merged.hashtags = merged.hashtags.into_iter().map(normalize_hashtag).collect();
    merged.recount();
    merged
}

/// Ensure a hashtag carries exactly one leading `#`.
pub fn normalize_hashtag(tag: String) -> String {
    let trimmed = tag.trim().trim_start_matches('#');
    format!("#{}", trimmed)
}

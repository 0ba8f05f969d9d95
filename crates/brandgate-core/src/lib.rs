//! # brandgate-core
//!
//! Deterministic domain model for the Brandgate content quality gate.
//!
//! This crate answers, for one generated draft:
//! - Is this copy acceptable as-is?
//! - Must a human look at it before it ships?
//! - Must it be stopped outright?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: the same verdicts always yield the same decision
//! 2. **No I/O**: generation, scoring, linting and storage live in `brandgate-runtime`
//! 3. **Blocking is absolute**: a blocked verdict dominates every other signal
//! 4. **Blocked output is never exposed**: blocked outcomes carry no candidate
//!
//! ## Example
//!
//! ```rust,ignore
//! use brandgate_core::{decide, Decision};
//!
//! match decide(&quality, &compliance, attempts_remaining) {
//!     Decision::Accept => ship(candidate),
//!     Decision::Review => queue_for_review(candidate),
//!     Decision::Block => reject(),
//!     Decision::Retry => regenerate(),
//!     Decision::Exhaust => give_up(),
//! }
//! ```

pub mod candidate;
pub mod decision;
pub mod outcome;
pub mod parser;
pub mod prompt;
pub mod response;
pub mod types;
pub mod validation;
pub mod verdict;

// Re-export main types at crate root
pub use candidate::{merge_fixes, Candidate, CandidateField};
pub use decision::{decide, is_acceptable, AttemptPhase, Decision, MAX_REGENERATION_ATTEMPTS};
pub use outcome::{
    AttemptRecord, GenerationOutcome, OutcomeStatus, BLOCKED_MESSAGE, EXHAUSTED_MESSAGE,
};
pub use parser::{
    parse_candidate, parse_candidate_or_fallback, ParseDefaults, ParseError, ParsedCandidate,
};
pub use prompt::{build_prompt, Prompt};
pub use response::{ErrorCode, GenerationResponse, ResponseOutput};
pub use types::{
    BrandSafetyConfig, BrandVoice, ContentInput, GenerationRequest, GenerationUsage, Platform,
    SafetyMode,
};
pub use validation::{
    validate_request, validate_request_str, FieldError, ValidationError, REQUEST_SCHEMA_JSON,
};
pub use verdict::{
    AppliedFix, ComplianceVerdict, FixKind, QualityVerdict, SubScores, ViolationCategory,
    Violations,
};

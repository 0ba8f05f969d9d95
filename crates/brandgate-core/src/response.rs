//! Mapping terminal outcomes to the caller-visible response shape.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outcome::{GenerationOutcome, BLOCKED_MESSAGE, EXHAUSTED_MESSAGE};
use crate::validation::FieldError;
use crate::verdict::{ComplianceVerdict, QualityVerdict};

/// Machine-readable class of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Blocked,
    Exhausted,
    Validation,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Blocked => "blocked",
            ErrorCode::Exhausted => "exhausted",
            ErrorCode::Validation => "validation",
            ErrorCode::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Generated copy with the verdicts that let it through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutput {
    pub headline: String,
    pub body: String,
    pub cta: String,
    pub hashtags: Vec<String>,
    pub bfs: QualityVerdict,
    pub linter: ComplianceVerdict,
}

/// Response returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ResponseOutput>,

    pub needs_review: bool,

    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    /// Field-level problems for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,

    /// Id of the persisted audit entry, when the write succeeded
    pub log_id: Option<String>,
}

impl GenerationResponse {
    /// Map a terminal outcome to the response.
    pub fn from_outcome(outcome: &GenerationOutcome, log_id: Option<String>) -> Self {
        match outcome {
            GenerationOutcome::Accepted {
                candidate,
                quality,
                compliance,
            }
            | GenerationOutcome::NeedsReview {
                candidate,
                quality,
                compliance,
            } => Self {
                success: true,
                output: Some(ResponseOutput {
                    headline: candidate.headline.clone(),
                    body: candidate.body.clone(),
                    cta: candidate.cta.clone(),
                    hashtags: candidate.hashtags.clone(),
                    bfs: quality.clone(),
                    linter: compliance.clone(),
                }),
                needs_review: matches!(outcome, GenerationOutcome::NeedsReview { .. }),
                blocked: false,
                error: None,
                code: None,
                errors: Vec::new(),
                log_id,
            },
            GenerationOutcome::Blocked { .. } => Self {
                blocked: true,
                ..Self::failure(ErrorCode::Blocked, BLOCKED_MESSAGE, log_id)
            },
            GenerationOutcome::Exhausted { .. } => {
                Self::failure(ErrorCode::Exhausted, EXHAUSTED_MESSAGE, log_id)
            }
        }
    }

    /// A failure response without output.
    pub fn failure(code: ErrorCode, message: impl Into<String>, log_id: Option<String>) -> Self {
        Self {
            success: false,
            output: None,
            needs_review: false,
            blocked: code == ErrorCode::Blocked,
            error: Some(message.into()),
            code: Some(code),
            errors: Vec::new(),
            log_id,
        }
    }

    /// Rejection of a malformed request body.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            ..Self::failure(ErrorCode::Validation, "Invalid request", None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;

    fn accepted() -> GenerationOutcome {
        GenerationOutcome::Accepted {
            candidate: Candidate::new("Hello", "World", "Buy", vec!["#hi".to_string()]),
            quality: QualityVerdict::uniform(0.92, true),
            compliance: ComplianceVerdict::clean(),
        }
    }

    #[test]
    fn test_accepted_response() {
        let response = GenerationResponse::from_outcome(&accepted(), Some("log-1".to_string()));
        assert!(response.success);
        assert!(!response.needs_review);
        assert!(!response.blocked);
        assert_eq!(response.output.as_ref().unwrap().headline, "Hello");
        assert_eq!(response.log_id.as_deref(), Some("log-1"));
    }

    #[test]
    fn test_needs_review_still_returns_output() {
        let outcome = match accepted() {
            GenerationOutcome::Accepted {
                candidate,
                quality,
                compliance,
            } => GenerationOutcome::NeedsReview {
                candidate,
                quality,
                compliance,
            },
            other => other,
        };
        let response = GenerationResponse::from_outcome(&outcome, None);
        assert!(response.success);
        assert!(response.needs_review);
        assert!(response.output.is_some());
    }

    #[test]
    fn test_blocked_response() {
        let outcome = GenerationOutcome::Blocked {
            quality: QualityVerdict::uniform(0.9, true),
            compliance: ComplianceVerdict {
                blocked: true,
                ..ComplianceVerdict::default()
            },
        };
        let response = GenerationResponse::from_outcome(&outcome, Some("log-2".to_string()));
        assert!(!response.success);
        assert!(response.blocked);
        assert!(response.output.is_none());
        assert_eq!(response.error.as_deref(), Some("Content blocked by safety filters"));
        assert_eq!(response.code, Some(ErrorCode::Blocked));
    }

    #[test]
    fn test_exhausted_response() {
        let response =
            GenerationResponse::from_outcome(&GenerationOutcome::exhausted(None), None);
        assert!(!response.success);
        assert!(!response.blocked);
        assert_eq!(
            response.error.as_deref(),
            Some("Failed to generate acceptable content after multiple attempts")
        );
        assert_eq!(response.code, Some(ErrorCode::Exhausted));
    }

    #[test]
    fn test_serialized_shape() {
        let response = GenerationResponse::from_outcome(&accepted(), None);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["needs_review"], false);
        assert!(json["log_id"].is_null());
        assert!(json.get("error").is_none());
        assert_eq!(json["output"]["bfs"]["passed"], true);
    }
}

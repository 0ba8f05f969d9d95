//! Request body validation.
//!
//! Requests are checked against the embedded JSON Schema, which reports
//! every problem found keyed by JSON pointer, and then deserialized.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::types::GenerationRequest;

/// Embedded request schema (loaded at compile time).
pub const REQUEST_SCHEMA_JSON: &str = include_str!("../schema/generation_request.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// One problem with a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// JSON pointer to the offending field ("" for the document root)
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from request validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request validation failed with {} error(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error("Failed to load request schema: {0}")]
    Schema(String),
}

impl ValidationError {
    /// Field-level errors, empty for schema load failures.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ValidationError::Invalid(errors) => errors,
            ValidationError::Schema(_) => &[],
        }
    }
}

fn get_validator() -> Result<&'static jsonschema::Validator, ValidationError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(REQUEST_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| ValidationError::Schema(e.clone()))
}

/// Validate a raw request body and deserialize it.
pub fn validate_request(body: &serde_json::Value) -> Result<GenerationRequest, ValidationError> {
    let validator = get_validator()?;

    let schema_errors: Vec<FieldError> = validator
        .iter_errors(body)
        .map(|e| FieldError::new(e.instance_path.to_string(), e.to_string()))
        .collect();

    if !schema_errors.is_empty() {
        return Err(ValidationError::Invalid(schema_errors));
    }

    serde_json::from_value(body.clone())
        .map_err(|e| ValidationError::Invalid(vec![FieldError::new("", e.to_string())]))
}

/// Validate a request body given as JSON text.
pub fn validate_request_str(body: &str) -> Result<GenerationRequest, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        ValidationError::Invalid(vec![FieldError::new("", format!("Malformed JSON: {}", e))])
    })?;
    validate_request(&value)
}

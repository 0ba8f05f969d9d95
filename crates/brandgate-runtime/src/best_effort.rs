//! Primary results with side-channel warnings.

use serde::Serialize;

/// A value plus warnings from best-effort steps that failed without
/// affecting it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestEffort<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> BestEffort<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn degraded(value: T, warning: impl Into<String>) -> Self {
        Self {
            value,
            warnings: vec![warning.into()],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Move the warnings into `sink` and return the value.
    pub fn drain_into(self, sink: &mut Vec<String>) -> T {
        sink.extend(self.warnings);
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BestEffort<U> {
        BestEffort {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

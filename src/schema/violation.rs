//! Validation outcomes
//!
//! A failed field check is data, not an error: it flows into the error
//! index and never aborts a store mutation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::RowId;

/// Category of a field violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Required text is empty or missing
    RequiredField,
    /// Value has the wrong JSON type
    TypeMismatch,
    /// Value is not one of the enum options
    InvalidOption,
    /// Number outside `[min, max]`
    OutOfRange,
    /// Number not reachable from `min` by whole steps
    InvalidStep,
}

impl ViolationKind {
    /// Returns the name used in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::RequiredField => "RequiredFieldError",
            ViolationKind::TypeMismatch => "TypeMismatchError",
            ViolationKind::InvalidOption => "InvalidOptionError",
            ViolationKind::OutOfRange => "OutOfRangeError",
            ViolationKind::InvalidStep => "InvalidStepError",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldViolation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of validating one value against one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult {
    Valid,
    Invalid(FieldViolation),
}

impl ValidationResult {
    pub(crate) fn invalid(kind: ViolationKind, message: impl Into<String>) -> Self {
        ValidationResult::Invalid(FieldViolation::new(kind, message))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// The violation, if any
    pub fn violation(&self) -> Option<&FieldViolation> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(v) => Some(v),
        }
    }

    /// The violation message, if any
    pub fn message(&self) -> Option<&str> {
        self.violation().map(FieldViolation::message)
    }
}

/// Per-field results of one row
pub type FieldResults = BTreeMap<String, ValidationResult>;

/// Per-row results of a set of rows
pub type RowResults = BTreeMap<RowId, FieldResults>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ViolationKind::OutOfRange.as_str(), "OutOfRangeError");
        assert_eq!(ViolationKind::RequiredField.to_string(), "RequiredFieldError");
    }

    #[test]
    fn test_result_accessors() {
        let ok = ValidationResult::Valid;
        assert!(ok.is_valid());
        assert_eq!(ok.message(), None);

        let bad = ValidationResult::invalid(ViolationKind::InvalidStep, "Age must be whole");
        assert!(!bad.is_valid());
        assert_eq!(bad.message(), Some("Age must be whole"));
        assert_eq!(bad.violation().unwrap().kind, ViolationKind::InvalidStep);
    }
}

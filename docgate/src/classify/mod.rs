//! Failure taxonomy and degraded-output policy.
//!
//! Every failure leaving the executor is classified into an [`ErrorKind`]
//! with a fixed [`ErrorProfile`]. Classification is an ordered chain of
//! [`ClassificationRule`]s matched against the error message; the first rule
//! with a matching pattern wins and anything unmatched is
//! [`ErrorKind::Unknown`].
//!
//! # Example
//!
//! ```
//! use docgate::classify::{ErrorClassifier, ErrorKind};
//!
//! let classifier = ErrorClassifier::default();
//! let info = classifier.classify("Out of memory while rasterizing page 3");
//!
//! assert_eq!(info.kind, ErrorKind::Memory);
//! assert!(info.retryable);
//! assert!(info.fallback_eligible);
//! ```

mod fallback;
mod rules;

pub use fallback::{create_fallback, FallbackPolicy};
pub use rules::{ClassificationRule, ErrorClassifier, DEFAULT_RULES};

use serde::Serialize;
use std::fmt;

/// Failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Memory,
    Timeout,
    Validation,
    DataAccess,
    Generation,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        Self::Memory,
        Self::Timeout,
        Self::Generation,
        Self::Validation,
        Self::DataAccess,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::DataAccess => "data_access",
            Self::Generation => "generation",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed retry/fallback/severity profile for this kind.
    pub fn profile(&self) -> ErrorProfile {
        let (retryable, fallback_eligible, severity) = match self {
            Self::Memory => (true, true, Severity::High),
            Self::Timeout => (true, true, Severity::Medium),
            Self::Generation => (true, true, Severity::High),
            Self::Validation => (false, true, Severity::Medium),
            Self::DataAccess => (true, false, Severity::High),
            Self::Unknown => (false, true, Severity::Critical),
        };
        ErrorProfile {
            retryable,
            fallback_eligible,
            severity,
        }
    }

    /// Message safe to show to the person who requested the document.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Memory => "The server is under heavy load. Please try again shortly.",
            Self::Timeout => "Document generation took too long. Please try again.",
            Self::Validation => "The document data is incomplete or invalid.",
            Self::DataAccess => "The document data could not be loaded.",
            Self::Generation => "The document could not be generated.",
            Self::Unknown => "An unexpected error occurred while generating the document.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How serious a failure is, for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Fixed attributes of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorProfile {
    pub retryable: bool,
    pub fallback_eligible: bool,
    pub severity: Severity,
}

/// A classified failure, attached to the job's terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub fallback_eligible: bool,
    pub severity: Severity,
    pub user_message: String,
    pub technical_detail: String,
}

impl ErrorInfo {
    /// Builds the info for `kind`, filling in its profile.
    pub fn new(kind: ErrorKind, technical_detail: impl Into<String>) -> Self {
        let profile = kind.profile();
        Self {
            kind,
            retryable: profile.retryable,
            fallback_eligible: profile.fallback_eligible,
            severity: profile.severity,
            user_message: kind.user_message().to_string(),
            technical_detail: technical_detail.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.technical_detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let expected = [
            (ErrorKind::Memory, true, true, Severity::High),
            (ErrorKind::Timeout, true, true, Severity::Medium),
            (ErrorKind::Generation, true, true, Severity::High),
            (ErrorKind::Validation, false, true, Severity::Medium),
            (ErrorKind::DataAccess, true, false, Severity::High),
            (ErrorKind::Unknown, false, true, Severity::Critical),
        ];

        for (kind, retryable, fallback_eligible, severity) in expected {
            let profile = kind.profile();
            assert_eq!(profile.retryable, retryable, "{kind}");
            assert_eq!(profile.fallback_eligible, fallback_eligible, "{kind}");
            assert_eq!(profile.severity, severity, "{kind}");
        }
    }

    #[test]
    fn test_error_info_new_uses_profile() {
        let info = ErrorInfo::new(ErrorKind::DataAccess, "connection refused");
        assert!(info.retryable);
        assert!(!info.fallback_eligible);
        assert_eq!(info.severity, Severity::High);
        assert_eq!(info.user_message, ErrorKind::DataAccess.user_message());
        assert_eq!(info.to_string(), "data_access: connection refused");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_error_info_serializes() {
        let info = ErrorInfo::new(ErrorKind::Timeout, "deadline exceeded");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["severity"], "medium");
    }
}

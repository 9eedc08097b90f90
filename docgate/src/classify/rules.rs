//! Ordered pattern rules mapping error messages to kinds.

use super::{ErrorInfo, ErrorKind};
use crate::render::RenderError;
use std::error::Error;

/// One link of the classification chain.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub kind: ErrorKind,
    /// Lowercase substrings; any match selects `kind`.
    pub patterns: &'static [&'static str],
}

impl ClassificationRule {
    fn matches(&self, message_lower: &str) -> bool {
        self.patterns.iter().any(|p| message_lower.contains(p))
    }
}

/// Default chain, evaluated top to bottom.
pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        kind: ErrorKind::Memory,
        patterns: &[
            "out of memory",
            "allocation failed",
            "memory allocation",
            "cannot allocate memory",
            "memory limit exceeded",
            "capacity overflow",
        ],
    },
    ClassificationRule {
        kind: ErrorKind::Timeout,
        patterns: &["timed out", "timeout", "deadline exceeded", "deadline has elapsed"],
    },
    ClassificationRule {
        kind: ErrorKind::Generation,
        patterns: &[
            "layout",
            "font",
            "pdf",
            "image decode",
            "invalid output",
            "no renderer",
        ],
    },
    ClassificationRule {
        kind: ErrorKind::Validation,
        patterns: &[
            "invalid",
            "validation",
            "missing field",
            "missing required",
            "malformed",
        ],
    },
    ClassificationRule {
        kind: ErrorKind::DataAccess,
        patterns: &[
            "database",
            "connection",
            "query",
            "record not found",
            "source data",
            "permission denied",
            "i/o error",
        ],
    },
];

/// Classifies failure messages with an ordered rule chain.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Returns the kind of the first matching rule, or `Unknown`.
    pub fn kind_of(&self, message: &str) -> ErrorKind {
        let lower = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lower))
            .map(|rule| rule.kind)
            .unwrap_or(ErrorKind::Unknown)
    }

    /// Classifies a failure message.
    pub fn classify(&self, message: &str) -> ErrorInfo {
        ErrorInfo::new(self.kind_of(message), message)
    }

    /// Classifies an error using its message and its whole source chain.
    pub fn classify_error(&self, error: &(dyn Error + 'static)) -> ErrorInfo {
        self.classify(&error_chain_message(error))
    }

    /// Classifies a renderer error.
    ///
    /// Typed variants map straight to their kind. Only the inner message of
    /// [`RenderError::Failed`] goes through the rule chain.
    pub fn classify_render_error(&self, error: &RenderError) -> ErrorInfo {
        let kind = match error {
            RenderError::Failed(message) => self.kind_of(message),
            RenderError::InvalidRecord(_) => ErrorKind::Validation,
            RenderError::DataAccess(_) | RenderError::Io(_) => ErrorKind::DataAccess,
            RenderError::Cancelled => ErrorKind::Timeout,
        };
        ErrorInfo::new(kind, error_chain_message(error))
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

/// Joins an error and its sources with `": "`, skipping sources whose text
/// is already part of the message.
fn error_chain_message(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        let text = err.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = err.source();
    }
    message
}

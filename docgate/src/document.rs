//! Document types and per-request render options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of document a job produces.
///
/// Each type is served by exactly one registered renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Summary report built from a project record.
    Report,
    /// Result sheet for a single evaluation.
    Result,
    /// Process description document.
    Process,
}

impl DocumentType {
    /// All document types, in display order.
    pub const ALL: [DocumentType; 3] = [Self::Report, Self::Result, Self::Process];

    /// Returns the lowercase identifier used in config and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Result => "result",
            Self::Process => "process",
        }
    }

    /// Returns a human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Report => "Report",
            Self::Result => "Result",
            Self::Process => "Process",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown document type name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown document type '{0}' - expected one of: report, result, process")]
pub struct UnknownDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "result" => Ok(Self::Result),
            "process" => Ok(Self::Process),
            _ => Err(UnknownDocumentType(s.to_string())),
        }
    }
}

/// Whether a job renders a whole document or a part embedded in another one.
///
/// Selects the output size limit applied after rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentScope {
    #[default]
    Document,
    Subdocument,
}

impl fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Subdocument => write!(f, "subdocument"),
        }
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Same margin on every side.
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(40.0)
    }
}

/// Presentation options passed through to the renderer untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub margins: Margins,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_parse() {
        assert_eq!("report".parse::<DocumentType>().unwrap(), DocumentType::Report);
        assert_eq!(" Result ".parse::<DocumentType>().unwrap(), DocumentType::Result);
        assert_eq!("PROCESS".parse::<DocumentType>().unwrap(), DocumentType::Process);
        assert!("invoice".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_display_matches_parse() {
        for doc_type in DocumentType::ALL {
            assert_eq!(doc_type.to_string().parse::<DocumentType>().unwrap(), doc_type);
        }
    }

    #[test]
    fn test_document_type_serde() {
        let json = serde_json::to_string(&DocumentType::Process).unwrap();
        assert_eq!(json, "\"process\"");
    }

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_title("Quarterly")
            .with_author("Ops")
            .with_margins(Margins::uniform(10.0));

        assert_eq!(options.title.as_deref(), Some("Quarterly"));
        assert_eq!(options.author.as_deref(), Some("Ops"));
        assert!(options.subtitle.is_none());
        assert_eq!(options.margins.left, 10.0);
    }

    #[test]
    fn test_default_scope() {
        assert_eq!(DocumentScope::default(), DocumentScope::Document);
    }
}

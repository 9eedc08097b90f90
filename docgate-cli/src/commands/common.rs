//! Common types and utilities shared across CLI commands.

use std::path::Path;

use docgate::document::RenderOptions;
use serde_json::Value;

use crate::error::CliError;

/// Presentation flags shared by commands that render documents.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct OptionArgs {
    /// Document title (defaults to the record's `title` field)
    #[arg(long)]
    pub title: Option<String>,

    /// Line shown under the title
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Author shown in the header
    #[arg(long)]
    pub author: Option<String>,

    /// Subject shown in the header
    #[arg(long)]
    pub subject: Option<String>,
}

impl OptionArgs {
    pub fn to_render_options(&self) -> RenderOptions {
        RenderOptions {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
            subject: self.subject.clone(),
            ..RenderOptions::default()
        }
    }
}

/// Fallback flags: `--fallback` forces it on, `--no-fallback` off.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct FallbackArgs {
    /// Return a simplified text document if rendering fails
    #[arg(long, conflicts_with = "no_fallback")]
    pub fallback: bool,

    /// Fail instead of returning a simplified document
    #[arg(long)]
    pub no_fallback: bool,
}

impl FallbackArgs {
    /// `None` leaves the decision to the configuration.
    pub fn choice(&self) -> Option<bool> {
        match (self.fallback, self.no_fallback) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Read and parse a JSON record.
pub fn read_record(path: &Path) -> Result<Value, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::FileRead {
        path: path.to_path_buf(),
        error: e,
    })?;

    serde_json::from_str(&content).map_err(|e| CliError::InvalidRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fallback_choice() {
        let none = FallbackArgs::default();
        assert_eq!(none.choice(), None);

        let on = FallbackArgs {
            fallback: true,
            no_fallback: false,
        };
        assert_eq!(on.choice(), Some(true));

        let off = FallbackArgs {
            fallback: false,
            no_fallback: true,
        };
        assert_eq!(off.choice(), Some(false));
    }

    #[test]
    fn test_read_record() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.json");
        std::fs::write(&good, r#"{"name": "Alpha"}"#).unwrap();
        let bad = temp.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();

        assert_eq!(read_record(&good).unwrap()["name"], "Alpha");
        assert!(matches!(
            read_record(&bad),
            Err(CliError::InvalidRecord { .. })
        ));
        assert!(matches!(
            read_record(&temp.path().join("missing.json")),
            Err(CliError::FileRead { .. })
        ));
    }

    #[test]
    fn test_option_args_to_render_options() {
        let args = OptionArgs {
            title: Some("Audit".to_string()),
            author: Some("Ops".to_string()),
            ..OptionArgs::default()
        };
        let options = args.to_render_options();
        assert_eq!(options.title.as_deref(), Some("Audit"));
        assert_eq!(options.author.as_deref(), Some("Ops"));
        assert!(options.subtitle.is_none());
    }
}

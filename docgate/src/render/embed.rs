//! Loading files referenced by a record, with a placeholder on failure.
//!
//! A missing logo or attachment must not fail the whole document, so
//! renderers get a [`EmbeddedFile::Placeholder`] they can draw instead.

use std::path::{Path, PathBuf};

/// A file referenced from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedFile {
    /// File was read successfully.
    Loaded { path: PathBuf, bytes: Vec<u8> },
    /// File could not be read; draw a placeholder instead.
    Placeholder { path: PathBuf, reason: String },
}

impl EmbeddedFile {
    pub fn path(&self) -> &Path {
        match self {
            Self::Loaded { path, .. } | Self::Placeholder { path, .. } => path,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Returns the file bytes, or `None` for a placeholder.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Loaded { bytes, .. } => Some(bytes),
            Self::Placeholder { .. } => None,
        }
    }
}

/// Read a referenced file, falling back to a placeholder.
///
/// Never returns an error. A read failure is logged and reported as
/// [`EmbeddedFile::Placeholder`].
pub fn embedded_file(path: impl AsRef<Path>) -> EmbeddedFile {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => EmbeddedFile::Loaded {
            path: path.to_path_buf(),
            bytes,
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Embedded file unavailable, using placeholder"
            );
            EmbeddedFile::Placeholder {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_file_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logo.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let file = embedded_file(&path);
        assert!(!file.is_placeholder());
        assert_eq!(file.bytes(), Some(&b"\x89PNG"[..]));
        assert_eq!(file.path(), path.as_path());
    }

    #[test]
    fn test_embedded_file_missing_is_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.png");

        let file = embedded_file(&path);
        assert!(file.is_placeholder());
        assert!(file.bytes().is_none());
        match file {
            EmbeddedFile::Placeholder { reason, .. } => assert!(!reason.is_empty()),
            EmbeddedFile::Loaded { .. } => panic!("expected placeholder"),
        }
    }
}

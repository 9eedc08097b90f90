//! Plain-text fallback documents.
//!
//! When a render fails with a fallback-eligible error and the caller opted
//! in, the executor returns a text rendering of the record instead. The
//! output only uses primitive field access, so it cannot fail, and it is
//! deterministic: the same record always gives the same bytes.

use super::ErrorInfo;
use crate::document::{DocumentType, RenderOptions};
use serde_json::Value;

const NOTICE: &str =
    "This is a simplified version of the document. The full layout could not be generated.";

/// Decides whether a failed job gets fallback output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Default used when a request does not say either way.
    pub enabled: bool,
}

impl FallbackPolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Fallback is produced only for eligible errors, and only when the
    /// request (or, if it is silent, the default) asks for it.
    pub fn should_fallback(&self, info: &ErrorInfo, requested: Option<bool>) -> bool {
        info.fallback_eligible && requested.unwrap_or(self.enabled)
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Render `payload` as plain text.
///
/// Object keys are sorted, nested values are flattened to dotted paths and
/// array items are written as `key[i]`.
///
/// ```
/// use docgate::classify::create_fallback;
/// use docgate::document::{DocumentType, RenderOptions};
/// use serde_json::json;
///
/// let text = create_fallback(
///     DocumentType::Report,
///     &json!({"name": "Alpha", "owner": {"team": "Ops"}}),
///     &RenderOptions::default(),
/// );
/// let text = String::from_utf8(text).unwrap();
/// assert!(text.contains("name: Alpha"));
/// assert!(text.contains("owner.team: Ops"));
/// ```
pub fn create_fallback(
    document_type: DocumentType,
    payload: &Value,
    options: &RenderOptions,
) -> Vec<u8> {
    let mut out = String::new();

    let title = options
        .title
        .clone()
        .unwrap_or_else(|| document_type.title().to_string());
    out.push_str(&title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count().max(1)));
    out.push('\n');
    if let Some(subtitle) = &options.subtitle {
        out.push_str(subtitle);
        out.push('\n');
    }
    out.push_str(&format!("Document type: {}\n", document_type));
    if let Some(author) = &options.author {
        out.push_str(&format!("Author: {}\n", author));
    }
    if let Some(subject) = &options.subject {
        out.push_str(&format!("Subject: {}\n", subject));
    }
    out.push('\n');
    out.push_str(NOTICE);
    out.push_str("\n\n");

    let mut lines = Vec::new();
    flatten("", payload, &mut lines);
    if lines.is_empty() {
        out.push_str("(no fields)\n");
    }
    for (path, value) in lines {
        write_field(&mut out, &path, &value);
    }

    out.into_bytes()
}

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            if map.is_empty() && !prefix.is_empty() {
                lines.push((prefix.to_string(), "(empty)".to_string()));
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, &map[key.as_str()], lines);
            }
        }
        Value::Array(items) => {
            let base = if prefix.is_empty() { "items" } else { prefix };
            if items.is_empty() {
                lines.push((base.to_string(), "(empty)".to_string()));
            }
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", base, i), item, lines);
            }
        }
        scalar => {
            let path = if prefix.is_empty() { "value" } else { prefix };
            lines.push((path.to_string(), scalar_text(scalar)));
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Containers are flattened before reaching here.
        other => other.to_string(),
    }
}

/// Writes `path: value`, indenting continuation lines of multi-line values.
fn write_field(out: &mut String, path: &str, value: &str) {
    out.push_str(path);
    out.push(':');
    let mut lines = value.lines();
    if let Some(first) = lines.next() {
        out.push(' ');
        out.push_str(first);
    }
    out.push('\n');
    for line in lines {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}

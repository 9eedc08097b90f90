//! Built-in plain-text renderer.
//!
//! Lays a record out as a titled text document with one section per
//! top-level field. Paths listed under `attachments` are embedded by size,
//! or noted as unavailable.

use docgate::config::format_size;
use docgate::document::DocumentType;
use docgate::render::{
    embedded_file, BlockingRenderer, EmbeddedFile, RenderContext, RenderError, RendererRegistry,
};
use serde_json::{Map, Value};

const ATTACHMENTS_KEY: &str = "attachments";
const TITLE_KEY: &str = "title";

/// Registry with the text renderer for every document type.
pub fn registry() -> RendererRegistry {
    DocumentType::ALL
        .into_iter()
        .fold(RendererRegistry::new(), |registry, document_type| {
            registry.with(document_type, BlockingRenderer::new("text", render_text))
        })
}

/// Renders the record in `ctx` as plain text.
pub fn render_text(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    let fields = ctx
        .record
        .as_object()
        .ok_or_else(|| RenderError::InvalidRecord("record must be a JSON object".to_string()))?;

    let indent = " ".repeat((ctx.options.margins.left / 10.0).round().max(0.0) as usize);
    let mut out = String::new();

    let title = ctx
        .options
        .title
        .clone()
        .or_else(|| fields.get(TITLE_KEY).and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("{} Document", ctx.document_type.title()));
    push_line(&mut out, &indent, &title.to_uppercase());
    if let Some(subtitle) = &ctx.options.subtitle {
        push_line(&mut out, &indent, subtitle);
    }
    if let Some(author) = &ctx.options.author {
        push_line(&mut out, &indent, &format!("Prepared by {}", author));
    }
    if let Some(subject) = &ctx.options.subject {
        push_line(&mut out, &indent, &format!("Subject: {}", subject));
    }
    out.push('\n');

    let mut keys: Vec<&String> = fields
        .keys()
        .filter(|k| k.as_str() != TITLE_KEY && k.as_str() != ATTACHMENTS_KEY)
        .collect();
    keys.sort();

    for key in keys {
        ctx.check_cancelled()?;
        push_line(&mut out, &indent, &format!("[{}]", key));
        for line in value_text(&fields[key.as_str()])?.lines() {
            push_line(&mut out, &indent, &format!("  {}", line));
        }
        out.push('\n');
    }

    render_attachments(&mut out, &indent, fields)?;

    Ok(out.into_bytes())
}

fn render_attachments(
    out: &mut String,
    indent: &str,
    fields: &Map<String, Value>,
) -> Result<(), RenderError> {
    let Some(attachments) = fields.get(ATTACHMENTS_KEY) else {
        return Ok(());
    };
    let paths = attachments.as_array().ok_or_else(|| {
        RenderError::InvalidRecord("'attachments' must be a list of file paths".to_string())
    })?;

    push_line(out, indent, "[attachments]");
    for path in paths {
        let path = path.as_str().ok_or_else(|| {
            RenderError::InvalidRecord("attachment paths must be strings".to_string())
        })?;
        let line = match embedded_file(path) {
            EmbeddedFile::Loaded { bytes, .. } => {
                format!("  {} ({})", path, format_size(bytes.len() as u64))
            }
            EmbeddedFile::Placeholder { reason, .. } => {
                format!("  {} [unavailable: {}]", path, reason)
            }
        };
        push_line(out, indent, &line);
    }
    Ok(())
}

fn value_text(value: &Value) -> Result<String, RenderError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok("-".to_string()),
        other => serde_json::to_string_pretty(other)
            .map_err(|e| RenderError::Failed(format!("layout of field failed: {}", e))),
    }
}

fn push_line(out: &mut String, indent: &str, line: &str) {
    out.push_str(indent);
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate::document::{Margins, RenderOptions};
    use docgate::executor::JobId;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn context(record: Value, options: RenderOptions) -> RenderContext {
        RenderContext {
            job_id: JobId::new("job-test"),
            document_type: DocumentType::Report,
            record: Arc::new(record),
            options: Arc::new(options),
            cancellation: CancellationToken::new(),
        }
    }

    fn render(record: Value, options: RenderOptions) -> String {
        String::from_utf8(render_text(&context(record, options)).unwrap()).unwrap()
    }

    #[test]
    fn test_renders_sections_in_key_order() {
        let text = render(
            json!({"title": "Site Audit", "zeta": 1, "alpha": "first"}),
            RenderOptions::new().with_margins(Margins::uniform(0.0)),
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SITE AUDIT");
        let alpha = text.find("[alpha]").unwrap();
        let zeta = text.find("[zeta]").unwrap();
        assert!(alpha < zeta);
        assert!(!text.contains("[title]"));
    }

    #[test]
    fn test_option_title_wins_over_record_title() {
        let text = render(
            json!({"title": "From record"}),
            RenderOptions::new().with_title("From options").with_author("Ops"),
        );
        assert!(text.contains("FROM OPTIONS"));
        assert!(text.contains("Prepared by Ops"));
    }

    #[test]
    fn test_non_object_record_is_invalid() {
        let ctx = context(json!([1, 2]), RenderOptions::new());
        assert!(matches!(
            render_text(&ctx),
            Err(RenderError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_attachments_loaded_and_missing() {
        let temp = TempDir::new().unwrap();
        let logo = temp.path().join("logo.png");
        std::fs::write(&logo, vec![0u8; 2048]).unwrap();
        let missing = temp.path().join("missing.png");

        let text = render(
            json!({ "attachments": [logo.to_str().unwrap(), missing.to_str().unwrap()] }),
            RenderOptions::new(),
        );

        assert!(text.contains("logo.png (2KB)"));
        assert!(text.contains("[unavailable:"));
    }

    #[test]
    fn test_cancelled_context_stops_rendering() {
        let ctx = context(json!({"a": 1}), RenderOptions::new());
        ctx.cancellation.cancel();
        assert!(matches!(render_text(&ctx), Err(RenderError::Cancelled)));
    }

    #[test]
    fn test_registry_covers_all_types() {
        let registry = registry();
        for document_type in DocumentType::ALL {
            assert!(registry.contains(document_type));
        }
    }
}

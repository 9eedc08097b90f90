//! Renderer lookup by document type.

use super::Renderer;
use crate::document::DocumentType;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each document type to the renderer that serves it.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<DocumentType, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, document_type: DocumentType, renderer: impl Renderer + 'static) -> Self {
        self.register(document_type, Arc::new(renderer));
        self
    }

    /// Registers a renderer, replacing any previous one for the type.
    pub fn register(&mut self, document_type: DocumentType, renderer: Arc<dyn Renderer>) {
        if let Some(previous) = self.renderers.insert(document_type, renderer) {
            tracing::debug!(
                document_type = %document_type,
                previous = previous.name(),
                "Replaced renderer"
            );
        }
    }

    pub fn get(&self, document_type: DocumentType) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(&document_type).cloned()
    }

    pub fn contains(&self, document_type: DocumentType) -> bool {
        self.renderers.contains_key(&document_type)
    }

    /// Registered document types in display order.
    pub fn document_types(&self) -> Vec<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .filter(|t| self.renderers.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("document_types", &self.document_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlockingRenderer;

    #[test]
    fn test_register_and_lookup() {
        let registry = RendererRegistry::new()
            .with(DocumentType::Process, BlockingRenderer::new("a", |_| Ok(vec![1])))
            .with(DocumentType::Report, BlockingRenderer::new("b", |_| Ok(vec![2])));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(DocumentType::Report));
        assert!(!registry.contains(DocumentType::Result));
        assert_eq!(
            registry.document_types(),
            vec![DocumentType::Report, DocumentType::Process]
        );
        assert_eq!(registry.get(DocumentType::Process).unwrap().name(), "a");
    }

    #[test]
    fn test_register_replaces() {
        let registry = RendererRegistry::new()
            .with(DocumentType::Report, BlockingRenderer::new("old", |_| Ok(vec![])))
            .with(DocumentType::Report, BlockingRenderer::new("new", |_| Ok(vec![])));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(DocumentType::Report).unwrap().name(), "new");
    }
}

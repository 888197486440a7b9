use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use legitcred_core::ContentId;

use crate::error::ResolutionError;
use crate::traits::ContentResolver;

/// In-memory content store for tests and local development.
#[derive(Default)]
pub struct MemoryResolver {
    documents: DashMap<String, serde_json::Value>,
    failing: DashSet<String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, content_id: impl Into<String>, document: serde_json::Value) {
        self.documents.insert(content_id.into(), document);
    }

    /// Make `content_id` time out on every resolve.
    pub fn fail(&self, content_id: impl Into<String>) {
        self.failing.insert(content_id.into());
    }

    pub fn clear_faults(&self) {
        self.failing.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl ContentResolver for MemoryResolver {
    async fn resolve(&self, content_id: &ContentId) -> Result<serde_json::Value, ResolutionError> {
        if self.failing.contains(content_id.as_str()) {
            return Err(ResolutionError::Timeout(content_id.to_string()));
        }
        self.documents
            .get(content_id.as_str())
            .map(|d| d.clone())
            .ok_or_else(|| ResolutionError::NotFound(content_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_resolve() {
        let resolver = MemoryResolver::new();
        resolver.insert("doc1", serde_json::json!({"organization": "Acme"}));
        let doc = resolver.resolve(&ContentId::new("doc1").unwrap()).await.unwrap();
        assert_eq!(doc["organization"], "Acme");
        assert_eq!(resolver.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_failing() {
        let resolver = MemoryResolver::new();
        resolver.insert("doc1", serde_json::json!({}));
        resolver.fail("doc1");
        let cid = ContentId::new("doc1").unwrap();
        assert!(matches!(
            resolver.resolve(&cid).await,
            Err(ResolutionError::Timeout(_))
        ));
        resolver.clear_faults();
        assert!(resolver.resolve(&cid).await.is_ok());
        assert!(resolver
            .resolve(&ContentId::new("nope").unwrap())
            .await
            .unwrap_err()
            .is_not_found());
    }
}

use async_trait::async_trait;

use legitcred_core::ContentId;

use crate::error::ResolutionError;

/// Fetches metadata documents by content identifier.
///
/// Resolvers are stateless and do not cache.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Fetch and parse the document stored under `content_id`.
    async fn resolve(&self, content_id: &ContentId) -> Result<serde_json::Value, ResolutionError>;
}

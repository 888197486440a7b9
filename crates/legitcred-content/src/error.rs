/// Errors returned when a metadata document cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("content {0} timed out")]
    Timeout(String),

    /// The gateway could not be reached.
    #[error("content gateway unavailable: {0}")]
    Unavailable(String),

    #[error("content {content_id} returned HTTP {status}")]
    Status { content_id: String, status: u16 },

    #[error("content {0} not found")]
    NotFound(String),

    /// The payload is not a JSON object.
    #[error("content {content_id} is malformed: {reason}")]
    Malformed { content_id: String, reason: String },
}

impl ResolutionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

use std::time::Duration;

/// Batch-level failure talking to a storefront admin API.
///
/// Any of these means none of the batch's adjustments may be assumed applied.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode remote response: {0}")]
    Decode(String),

    #[error("remote rejected the request: {}", .0.join("; "))]
    Graphql(Vec<String>),
}

impl RemoteError {
    /// Short machine-readable label, used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Transport(_) => "transport",
            RemoteError::Timeout(_) => "timeout",
            RemoteError::Status { .. } => "status",
            RemoteError::Decode(_) => "decode",
            RemoteError::Graphql(_) => "graphql",
        }
    }
}

use thiserror::Error;

/// Failures of the session engine. All of these are recoverable: a failed
/// file operation or a dropped transport degrades to a notification, never
/// to a dead session.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("file api request failed: {0}")]
    FileApi(#[from] reqwest::Error),

    #[error("file operation failed: {0}")]
    FileOp(String),

    #[error("no such file in session: {0}")]
    UnknownFile(String),
}

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("completion transport error: {0}")]
    Transport(String),

    #[error("completion service error: {0}")]
    Service(String),

    #[error("completion stream closed before a response arrived")]
    NoResponse,
}

use std::time::Duration;

use thiserror::Error;

use crate::persist::PersistError;

/// Failures of the debugging-protocol layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Endpoint discovery or the websocket handshake failed.
    #[error("cannot connect to browser at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The established connection broke while in use.
    #[error("browser connection lost: {0}")]
    Transport(String),

    /// The browser answered a request with an error object.
    #[error("{method} failed: {detail}")]
    Protocol { method: String, detail: String },

    /// A bounded wait hit its deadline.
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout { waiting_for: String, after: Duration },

    /// A reply was missing a field the caller depends on.
    #[error("unexpected {method} reply: {detail}")]
    InvalidResponse { method: String, detail: String },

    #[error("frame serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// True when the connection itself is unusable and must be re-established.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, SessionError::Connection { .. } | SessionError::Transport(_))
    }
}

/// The markup could not be turned into a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid source address {0:?}")]
    InvalidAddress(String),
    #[error("document markup is empty")]
    EmptyDocument,
    #[error("no slug can be derived from the address path or title")]
    Unnameable,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("header serialization failed: {0}")]
    Header(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Extraction and header failures are final; every other failure may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::Extraction(_) | PipelineError::Header(_))
    }
}

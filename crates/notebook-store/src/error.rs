//! Error types for the storage layer.

use notebook_core::{NoteId, NotebookId};
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure or undecodable response body.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("remote API error ({status}): {body}")]
    Http { status: u16, body: String },

    /// No credentials are configured; the user must authorize first.
    #[error("authorization required, visit {authorize_url}")]
    AuthorizationRequired { authorize_url: String },

    /// No backend is registered under this kind.
    #[error("unknown backend kind: {0}")]
    UnknownBackend(String),

    /// A required connection option is absent or empty.
    #[error("missing required option `{name}` for backend {kind}")]
    MissingOption { kind: String, name: String },

    /// A connection option has an unusable value.
    #[error("invalid value for option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    /// Notebook not found.
    #[error("notebook not found: {0}")]
    NotebookNotFound(NotebookId),

    /// Note not found.
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    /// A file's content could not be decoded as UTF-8 text.
    #[error("invalid content in {path}: {reason}")]
    InvalidContent { path: String, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StoreError {
    /// HTTP status of the remote answer, if the error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the remote API reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotebookNotFound(_) | Self::NoteNotFound(_) => true,
            _ => self.status() == Some(404),
        }
    }
}

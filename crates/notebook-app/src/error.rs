//! Application error types.

use notebook_core::DispatchError;
use notebook_store::StoreError;

/// Error raised by a controller reaction or an application service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A subscriber failed while the controller published an event.
    #[error("event dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The reaction needs an active backend and none is connected.
    #[error("no storage backend connected")]
    NotConnected,

    /// The reaction needs a current notebook and none is selected.
    #[error("no notebook selected")]
    NoNotebookSelected,

    /// Bus-triggered reactions need a tokio runtime to run on.
    #[error("controller must be bound from within a tokio runtime")]
    NoRuntime,

    /// No saved connection profile has this name.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A local file holds malformed JSON.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::AuthorizationRequired { .. }) => "AUTHORIZATION_REQUIRED",
            Self::Store(StoreError::Http { .. } | StoreError::Request(_)) => "REMOTE_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
            Self::Dispatch(_) => "DISPATCH_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::NoNotebookSelected => "NO_NOTEBOOK_SELECTED",
            Self::NoRuntime => "NO_RUNTIME",
            Self::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Self::Io(_) | Self::Json(_) => "LOCAL_STATE_ERROR",
        }
    }
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

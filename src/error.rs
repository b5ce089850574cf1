use crate::registry::EntityKind;
use thiserror::Error;

/// Any failure reported by the record store. Status codes are not distinguished.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for RemoteError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(format!("{e:#}"))
    }
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("remote store failed: {0}")]
    Remote(#[from] RemoteError),

    /// A mutating operation was asked for a local id that has no remote mapping.
    #[error("no {kind} is mapped to local id {local_id}")]
    Resolution { kind: EntityKind, local_id: i64 },

    #[error("create on {collection} returned no record identifier")]
    Creation { collection: String },

    #[error("{0}")]
    Validation(String),

    #[error("{what} not found")]
    NotFound { what: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound { what: what.into() }
    }

    /// Stable error code for the IPC layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Remote(_) => "remote_error",
            CoreError::Resolution { .. } => "unmapped_id",
            CoreError::Creation { .. } => "creation_failed",
            CoreError::Validation(_) => "validation_failed",
            CoreError::NotFound { .. } => "not_found",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

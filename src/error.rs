//! Error taxonomy shared by the stores, the facade and the backend.

use thiserror::Error;

/// Errors returned by every collection operation.
///
/// None of these are fatal: callers render them as a message and the
/// collection is left untouched.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Bad input shape (empty title, missing seasons, bad episode totals...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation needs an identity that is absent or was rejected.
    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request or could not be reached.
    #[error("{0}")]
    Remote(String),

    /// Local persistence (database or storage file) failed.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        TrackerError::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        TrackerError::NotFound(message.into())
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        TrackerError::Auth(message.into())
    }

    /// Stable identifier used on the wire between backend and client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Validation(_) => ErrorKind::Validation,
            TrackerError::Auth(_) => ErrorKind::Auth,
            TrackerError::NotFound(_) => ErrorKind::NotFound,
            TrackerError::Remote(_) => ErrorKind::Remote,
            TrackerError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Rebuilds an error from its wire representation.
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => TrackerError::Validation(message),
            ErrorKind::Auth => TrackerError::Auth(message),
            ErrorKind::NotFound => TrackerError::NotFound(message),
            // Storage failures on the backend are remote failures for the client.
            ErrorKind::Remote | ErrorKind::Storage => TrackerError::Remote(message),
        }
    }

    /// Message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            TrackerError::Validation(m)
            | TrackerError::Auth(m)
            | TrackerError::NotFound(m)
            | TrackerError::Remote(m) => m.clone(),
            TrackerError::Storage(err) => format!("{:#}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Remote,
    Storage,
}

/// Wire message for storage failures. The underlying chain only goes to
/// the server log since it can name paths and SQL.
pub const STORAGE_ERROR_MESSAGE: &str = "Internal storage error";

/// JSON body of every non-2xx backend response.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TrackerError> for ErrorBody {
    fn from(err: &TrackerError) -> Self {
        let message = match err {
            TrackerError::Storage(_) => STORAGE_ERROR_MESSAGE.to_string(),
            other => other.message(),
        };
        ErrorBody {
            kind: err.kind(),
            message,
        }
    }
}

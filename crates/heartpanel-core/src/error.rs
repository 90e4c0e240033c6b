use std::path::PathBuf;

use thiserror::Error;

/// Failure writing to or reading from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid storage key: {key:?}")]
    InvalidKey { key: String },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failure of a request to the predict or report endpoint.
///
/// None of these are fatal: the form stays editable and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    /// Non-success response. `message` is the server's `error` text verbatim.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteFailure {
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

/// Notice shown when a report is requested before any prediction.
pub const NO_PREDICTION_NOTICE: &str = "Run prediction first";

/// Failure of the report flow.
#[derive(Debug, Error)]
pub enum ReportError {
    /// No successful prediction is held; nothing was sent.
    #[error("{}", NO_PREDICTION_NOTICE)]
    NoPrediction,

    /// A later report request replaced this one; its outcome was dropped.
    #[error("report {seq} superseded by report {latest}")]
    Superseded { seq: u64, latest: u64 },

    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    #[error("failed to write report to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure loading or validating a [`PanelConfig`](crate::config::PanelConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

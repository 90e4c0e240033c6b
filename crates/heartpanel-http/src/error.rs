use thiserror::Error;

pub type Result<T> = std::result::Result<T, HttpError>;

/// Failure constructing a transport. Request-time failures are
/// [`RemoteFailure`](heartpanel_core::RemoteFailure)s instead.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP client error: {0}")]
    Build(#[from] reqwest::Error),

    #[error("invalid endpoint URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl HttpError {
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}

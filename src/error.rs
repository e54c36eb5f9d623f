use reqwest::StatusCode;
use thiserror::Error;

/// Failure of an outbound call to the chatbot backend.
///
/// Every variant keeps the underlying cause so it can be logged; none of
/// them are shown to the user as-is.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("request to backend failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Body was not the JSON shape we expected
    #[error("could not decode backend response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl TransportError {
    /// HTTP status for `Status` errors, `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(e) | TransportError::Decode(e) => e.status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

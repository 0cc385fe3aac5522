use thiserror::Error;

/// Errors produced by the backend surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure: connection refused, timeout, TLS, or a
    /// response body that did not decode as the expected JSON.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.  `message` carries the
    /// `error` field of the response body when the server provided one.
    #[error("Server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

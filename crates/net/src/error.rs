//! Network error types

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// API client errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure: nothing reached the server. Retryable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the bearer token (401). Callers must treat
    /// this as an implicit session-invalid signal and log out.
    #[error("Session rejected by server")]
    Unauthorized,

    /// Non-2xx response with the server's message, surfaced verbatim
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl Error {
    /// Whether this failure never reached the server
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

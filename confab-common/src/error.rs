//! Error types for the Confab service.

use thiserror::Error;

/// Result type alias using the Confab error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Confab service.
///
/// Validation failures carry the exact client-facing message; upstream
/// failures carry internal detail and map to fixed generic strings via
/// [`Error::user_message`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required request field missing or empty
    #[error("{0}")]
    MissingField(String),

    /// Payload over a hard size limit
    #[error("{0}")]
    SizeLimit(String),

    /// Uploaded document produced no text
    #[error("File content is empty.")]
    EmptyContent,

    /// Upstream throttled the request
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Upstream rejected the request as malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream account quota exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other upstream or transport failure
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl Error {
    /// Check if this error came from request validation rather than an
    /// upstream call.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::SizeLimit(_) | Self::EmptyContent
        )
    }

    /// Check if this is an upstream rate limit error.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Check if this is an upstream quota error.
    pub const fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::SizeLimit(_) | Self::EmptyContent => 400,
            _ => 500,
        }
    }

    /// Client-facing message for this error.
    ///
    /// Validation errors surface their own text. Upstream failures map to a
    /// fixed table of generic strings so provider internals never leak to
    /// clients.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(msg) | Self::SizeLimit(msg) => msg.clone(),
            Self::EmptyContent => self.to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
            Self::InvalidRequest(_) => "Invalid request format.".to_string(),
            Self::QuotaExceeded(_) => "Service quota exceeded.".to_string(),
            Self::Upstream(_) => "An error occurred. Please try again.".to_string(),
            Self::Config(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

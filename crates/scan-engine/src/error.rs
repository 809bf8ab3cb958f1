//! Error types for the scan engine.

use thiserror::Error;

/// Coarse error classification shared by every fallible operation in the
/// engine. Call sites match on this rather than the concrete variant when
/// they only care about retry/propagation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    TransientExternal,
    PermanentExternal,
    RateLimited,
    InternalInvariant,
    DeadlineExceeded,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("unknown threat-intel source: {0}")]
    UnknownSource(String),

    #[error("url too long ({0} bytes)")]
    UrlTooLong(usize),

    #[error("transient error contacting {dependency}: {message}")]
    Transient { dependency: String, message: String },

    #[error("permanent error contacting {dependency}: {message}")]
    Permanent { dependency: String, message: String },

    #[error("rate limited by {0}")]
    RateLimited(String),

    #[error("scan deadline exceeded after {0}ms")]
    DeadlineExceeded(u64),

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::MalformedUrl(_)
            | ScanError::UnsupportedScheme(_)
            | ScanError::UnknownSource(_)
            | ScanError::UrlTooLong(_) => ErrorKind::InvalidInput,
            ScanError::Transient { .. } | ScanError::Io(_) => ErrorKind::TransientExternal,
            ScanError::Permanent { .. } | ScanError::Configuration(_) => {
                ErrorKind::PermanentExternal
            }
            ScanError::RateLimited(_) => ErrorKind::RateLimited,
            ScanError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            ScanError::Invariant(_) => ErrorKind::InternalInvariant,
            ScanError::Serialization(_) => ErrorKind::PermanentExternal,
            ScanError::Http(e) => {
                if e.is_timeout() {
                    ErrorKind::TransientExternal
                } else if e.is_status() {
                    ErrorKind::PermanentExternal
                } else {
                    ErrorKind::TransientExternal
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_kind() {
        assert_eq!(
            ScanError::MalformedUrl("x".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn deadline_kind() {
        assert_eq!(
            ScanError::DeadlineExceeded(500).kind(),
            ErrorKind::DeadlineExceeded
        );
    }
}

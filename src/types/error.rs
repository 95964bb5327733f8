//! Error types for the portfolio store and proxy
//!
//! Pattern adapted from doorway's `types/error.rs`: one enum for the whole
//! crate, with an HTTP status mapping used by the proxy server.

use hyper::StatusCode;

/// Main error type for portfolio operations
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    /// No object exists at the requested path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Version token mismatch on write (stale or missing sha)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Network or HTTP failure talking to the proxy or the remote host
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upload rejected because the declared media type is not a PDF
    #[error("Invalid file type: {0} (only application/pdf is accepted)")]
    InvalidFileType(String),

    #[error("Activity index {index} out of range for week {week} ({len} activities)")]
    IndexOutOfRange { week: u8, index: usize, len: usize },

    /// Local mirror could not be read or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Week {0} does not exist (valid weeks are 1..=16)")]
    WeekNotFound(u8),

    /// The proxy answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A stored snapshot could not be decoded
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortfolioError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::WeekNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a read failure should fall through to the next storage tier
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Transport(_)
                | Self::InvalidResponse(_)
                | Self::InvalidDocument(_)
        )
    }
}

impl From<reqwest::Error> for PortfolioError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PortfolioError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for PortfolioError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidResponse(format!("base64 error: {}", err))
    }
}

impl From<std::io::Error> for PortfolioError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<hyper::Error> for PortfolioError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for portfolio operations
pub type Result<T> = std::result::Result<T, PortfolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PortfolioError::Conflict("sha".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PortfolioError::InvalidFileType("text/plain".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            PortfolioError::IndexOutOfRange { week: 2, index: 4, len: 1 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_fallback_classification() {
        assert!(PortfolioError::NotFound("data/snapshot.json".into()).is_fallback());
        assert!(PortfolioError::Transport("connection refused".into()).is_fallback());
        assert!(!PortfolioError::Conflict("stale".into()).is_fallback());
        assert!(!PortfolioError::StorageUnavailable("disk".into()).is_fallback());
    }

    #[test]
    fn test_io_error_maps_to_storage_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(
            PortfolioError::from(io),
            PortfolioError::StorageUnavailable(_)
        ));
    }
}

//! WolfDrop Error Types

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for WolfDrop operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfDrop error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Storage errors
    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Request errors
    #[error("Malformed upload: {0}")]
    Multipart(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// HTTP status a request failing with this error should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidPath(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Multipart(_) => StatusCode::BAD_REQUEST,
            Error::Config(_)
            | Error::ConfigParse(_)
            | Error::Io(_)
            | Error::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if the client can fix this by changing its request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::InvalidPath("..".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::NotFound("a.txt".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!io.is_client_error());
        assert!(Error::Multipart("bad boundary".into()).is_client_error());
    }
}

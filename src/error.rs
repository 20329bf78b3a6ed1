//! Error types for the background removal service

use thiserror::Error;
use warp::http::StatusCode;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, RemovalError>;

/// Error taxonomy for the request pipeline.
///
/// Adapter-level failures (`BackendUnavailable`, `BackendFailure`) are
/// recovered locally by the dispatcher via fallback; only failure of the
/// last-resort adapter, or failures in request parsing and encoding, reach
/// the HTTP boundary.
#[derive(Error, Debug)]
pub enum RemovalError {
    /// Uploaded bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Malformed hex color string (expected 6 hex digits, optional leading '#')
    #[error("Invalid color format: {0}")]
    InvalidColorFormat(String),

    /// Requested backend is not installed or configured
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend returned an error, exited non-zero, or timed out
    #[error("Backend failure: {0}")]
    BackendFailure(String),

    /// Malformed multipart form or missing required field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model download or hub access failure
    #[error("Network error: {0}")]
    Network(String),

    /// Catch-all for unrecoverable pipeline failures
    #[error("Processing error: {0}")]
    Processing(String),

    /// Input/output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or manipulation errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl RemovalError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new invalid color format error
    pub fn invalid_color<S: Into<String>>(msg: S) -> Self {
        Self::InvalidColorFormat(msg.into())
    }

    /// Create a new backend unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create a new backend failure error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::BackendFailure(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// HTTP status code this error maps to at the service boundary.
    ///
    /// Malformed client input is a 400; everything that escapes the
    /// pipeline after fallback is a 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::InvalidColorFormat(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            },
            Self::BackendUnavailable(_)
            | Self::BackendFailure(_)
            | Self::Network(_)
            | Self::Processing(_)
            | Self::Io(_)
            | Self::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RemovalError::invalid_color("expected 6 hex digits, got \"12\"");
        assert_eq!(
            err.to_string(),
            "Invalid color format: expected 6 hex digits, got \"12\""
        );

        let err = RemovalError::backend("exit status 3");
        assert_eq!(err.to_string(), "Backend failure: exit status 3");
    }

    #[test]
    fn test_client_errors_map_to_400() {
        assert_eq!(
            RemovalError::decode("bad png").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RemovalError::invalid_color("xyz").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RemovalError::invalid_request("missing 'file' field").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_pipeline_errors_map_to_500() {
        assert_eq!(
            RemovalError::processing("default backend failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RemovalError::backend("timed out").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RemovalError::network("download failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

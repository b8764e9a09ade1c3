//! Error types for kcal-estimator

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

/// Durable image store errors.
///
/// Never surfaced to HTTP callers; the pipeline logs them and keeps the
/// original image reference.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage credentials not configured")]
    MissingCredentials,

    #[error("Invalid data URL")]
    InvalidDataUrl,

    #[error("Failed to ensure bucket: {status} {body}")]
    Bucket { status: u16, body: String },

    #[error("Storage upload failed: {status} {body}")]
    Upload { status: u16, body: String },

    #[error("Storage transport error: {0}")]
    Transport(String),
}

/// Frame capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera is not available on this device")]
    CameraUnavailable,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Capture session has not been started")]
    SessionNotStarted,

    #[error("Capture failed: {0}")]
    CaptureFailure(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Caller supplied no usable image input
    #[error("{0}")]
    InvalidRequest(String),

    /// Vision model credential missing
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Vision model returned a non-success status, timed out, or broke the envelope
    #[error("Vision model error: {message}")]
    UpstreamError { status: Option<u16>, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status used when this error reaches the request boundary
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            _ => 500,
        }
    }

    /// Whether the pipeline turns this error into a degraded observation
    pub fn is_absorbed(&self) -> bool {
        matches!(
            self,
            Error::UpstreamError { .. } | Error::Decode(_) | Error::Storage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

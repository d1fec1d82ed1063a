//! Application error type
//!
//! Every failure in the app ends up as a toast, so each variant's
//! `Display` text is the user-facing message. The enum is `Clone`
//! because errors travel inside iced messages.
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Could not access camera. Check permissions or try a different device.")]
    CameraAccess(String),

    #[error("Camera capture is not supported on this platform.")]
    #[cfg_attr(target_os = "linux", allow(dead_code))]
    CameraUnsupported,

    #[error("Camera not active.")]
    CameraInactive,

    #[error("Could not capture frame — try again.")]
    FrameNotReady,

    #[error("Capture failed.")]
    CaptureFailed(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("No images detected.")]
    NoImages,

    #[error("Could not read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Malformed server response.")]
    MalformedResponse,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Request(err.to_string())
    }
}

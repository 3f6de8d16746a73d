// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the depth publisher

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for camera device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Result type for topic transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Process exit status on normal shutdown
pub const EXIT_OK: u8 = 0;
/// Process exit status when the camera could not be opened or configured
pub const EXIT_DEVICE_INIT: u8 = 1;
/// Process exit status for every other fatal error
pub const EXIT_RUNTIME: u8 = 2;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera device errors
    Device(DeviceError),
    /// Topic transport errors
    Transport(TransportError),
    /// Invalid configuration
    Config(String),
    /// Depth preview rendering or saving failed
    Preview(String),
    /// Filesystem errors
    Io(String),
}

/// Reason code reported when a camera fails to initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitErrorCode {
    /// No camera answered at the requested location
    NoDevice,
    /// The camera refused the requested resolution or depth format
    FormatRejected,
    /// Buffers or the capture stream could not be set up
    StreamFailed,
    /// The device node exists but could not be opened
    AccessDenied,
    /// Support for this backend was not compiled in
    Unsupported,
}

/// Camera device errors
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// Opening or configuring the camera failed
    InitFailed { code: InitErrorCode, detail: String },
    /// Grabbing a frame failed
    CaptureFailed(String),
    /// Retrieving a measurement for the last grabbed frame failed
    RetrieveFailed(String),
    /// The camera went away while streaming
    Disconnected,
}

/// Topic transport errors
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Could not bind the listening socket
    Bind { addr: String, reason: String },
    /// Socket read or write failed
    Io(String),
    /// A message could not be encoded
    Encode(String),
    /// A received frame was malformed
    Decode(String),
    /// The topic has no publisher anymore
    Closed,
}

impl AppError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Device(DeviceError::InitFailed { .. }) => EXIT_DEVICE_INIT,
            _ => EXIT_RUNTIME,
        }
    }
}

impl DeviceError {
    /// Shorthand for an initialization failure
    pub fn init(code: InitErrorCode, detail: impl Into<String>) -> Self {
        DeviceError::InitFailed {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Device(e) => write!(f, "Device error: {}", e),
            AppError::Transport(e) => write!(f, "Transport error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Preview(msg) => write!(f, "Preview error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for InitErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            InitErrorCode::NoDevice => "NO_DEVICE",
            InitErrorCode::FormatRejected => "FORMAT_REJECTED",
            InitErrorCode::StreamFailed => "STREAM_FAILED",
            InitErrorCode::AccessDenied => "ACCESS_DENIED",
            InitErrorCode::Unsupported => "UNSUPPORTED",
        };
        f.write_str(code)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InitFailed { code, detail } => {
                write!(f, "Initialization failed [{}]: {}", code, detail)
            }
            DeviceError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            DeviceError::RetrieveFailed(msg) => write!(f, "Retrieve failed: {}", msg),
            DeviceError::Disconnected => write!(f, "Camera disconnected"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Bind { addr, reason } => {
                write!(f, "Failed to bind {}: {}", addr, reason)
            }
            TransportError::Io(msg) => write!(f, "Socket error: {}", msg),
            TransportError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            TransportError::Decode(msg) => write!(f, "Malformed frame: {}", msg),
            TransportError::Closed => write!(f, "Topic closed"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for TransportError {}

// Conversions from sub-errors to AppError
impl From<DeviceError> for AppError {
    fn from(err: DeviceError) -> Self {
        AppError::Device(err)
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::Transport(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Preview(err.to_string())
    }
}

//! Error types for DLPC350 communication.

use thiserror::Error;

/// Errors that can occur while talking to a DLPC350 controller.
#[derive(Error, Debug)]
pub enum Error {
    /// USB communication error.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// No device with the requested vendor/product ID is attached.
    #[error("no device found with ID {vendor_id:04x}:{product_id:04x}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// A parameter is outside the range the controller accepts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The device accepted fewer bytes than were written.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Device returned invalid or unexpected data.
    #[error("invalid device response")]
    InvalidResponse,

    /// The controller flagged the command as failed in its reply.
    #[error("command {cmd2:#04x}:{cmd3:#04x} rejected by device")]
    CommandFailed { cmd2: u8, cmd3: u8 },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result type alias for DLPC350 operations.
pub type Result<T> = std::result::Result<T, Error>;

//! USB control of the DLPC350 controller in the TI Lightcrafter 4500 projector.
//!
//! This crate sends the DLPC350's USB commands to power the projector up and
//! down, switch between video and pattern sequence display, and program the
//! pattern sequence (pattern count, frame rate, bit depth, LED colors).
//!
//! # Getting Started
//!
//! The one-call helpers open the first attached projector, run a command
//! sequence and release the device:
//!
//! ```no_run
//! use lcr4500::{pattern_mode, video_mode, LedSelect, PatternModeConfig};
//!
//! // 1-bit patterns from the video input, green LED, 120 fps
//! let config = PatternModeConfig::default()
//!     .with_fps(120.0)?
//!     .with_bit_depth(1)?
//!     .with_leds(LedSelect::GREEN);
//! pattern_mode(&config)?;
//!
//! // Back to plain video
//! video_mode()?;
//! # Ok::<(), lcr4500::Error>(())
//! ```
//!
//! ## Individual commands
//!
//! [`Dlpc350`] exposes each controller command and keeps the connection open:
//!
//! ```no_run
//! use lcr4500::{ConnectionConfig, Dlpc350, PatternAction};
//!
//! let mut lcr = Dlpc350::open(&ConnectionConfig::default())?;
//! lcr.pattern_display(PatternAction::Stop)?;
//! println!("{}", lcr.main_status()?);
//! # Ok::<(), lcr4500::Error>(())
//! ```
//!
//! # Drivers
//!
//! The device is opened through libusb. On Windows install the libusb-win32
//! or WinUSB driver for the projector (for example with Zadig). On Linux the
//! kernel HID driver is detached automatically while the device is open.
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configuration and parameter types

pub mod config;
pub mod device;
mod error;
pub mod protocol;
pub mod sequence;
pub mod transport;
pub mod types;

pub use error::{Error, Result};

pub use config::{ConnectionConfig, PatternModeConfig};
pub use device::Dlpc350;
pub use protocol::{byte_count, fps_to_period, padded_len, Reply};
pub use sequence::{connect, pattern_mode, power_down, power_up, set_gamma, video_mode};
pub use transport::{Transport, UsbTransport};
pub use types::{
    BitDepth, DisplayMode, LedSelect, LutEntry, Mailbox, MainStatus, PatternAction,
    PatternConfig, PatternInputSource, PowerMode, TriggerMode, TriggerType,
};

// Re-export rusb for consumers matching on `Error::Usb`
pub use rusb;

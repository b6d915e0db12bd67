//! Low-level DLPC350 USB protocol: constants, report framing and replies.
//!
//! Every command travels as one or more 64-byte reports. The first report
//! starts with a six byte header:
//!
//! | byte | meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | flags (`0x40` write, `0xC0` read)               |
//! | 1    | sequence byte, echoed back in the reply         |
//! | 2..4 | payload length + 2, little endian               |
//! | 4    | CMD3 (command LSB)                              |
//! | 5    | CMD2 (command MSB)                              |
//!
//! Payloads longer than the 58 bytes left in the first report continue in
//! headerless reports. The final report is zero padded.

use std::fmt;

use crate::error::{Error, Result};

/// Texas Instruments USB vendor ID.
pub const VENDOR_ID: u16 = 0x0451;

/// DLPC350 (Lightcrafter 4500) USB product ID.
pub const PRODUCT_ID: u16 = 0x6401;

/// USB interface carrying the HID command endpoints.
pub const INTERFACE: u8 = 0;

/// Host to device endpoint.
pub const ENDPOINT_OUT: u8 = 0x01;

/// Device to host endpoint.
pub const ENDPOINT_IN: u8 = 0x81;

/// Size of a single HID report in bytes.
pub const REPORT_SIZE: usize = 64;

/// Size of the command header at the start of the first report.
pub const HEADER_SIZE: usize = 6;

/// Payload bytes that fit in the first report after the header.
pub const FIRST_REPORT_PAYLOAD: usize = REPORT_SIZE - HEADER_SIZE;

/// Size of the header at the start of a reply report.
pub const REPLY_HEADER_SIZE: usize = 4;

/// Flag byte for write commands.
pub const FLAG_WRITE: u8 = 0x40;

/// Flag byte for read commands (read bit plus reply request).
pub const FLAG_READ: u8 = 0xC0;

/// Set by the controller in a reply when the command failed.
pub const FLAG_REPLY_ERROR: u8 = 0x20;

/// A single 64-byte report as written to the device.
pub type Report = [u8; REPORT_SIZE];

/// Whether a command writes settings or reads them back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    /// Header flag byte for this direction.
    pub fn flags(self) -> u8 {
        match self {
            Direction::Write => FLAG_WRITE,
            Direction::Read => FLAG_READ,
        }
    }
}

/// A DLPC350 command identifier, the (CMD2, CMD3) pair from the programmer's guide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Command {
    /// Command MSB.
    pub cmd2: u8,
    /// Command LSB.
    pub cmd3: u8,
}

impl Command {
    pub const fn new(cmd2: u8, cmd3: u8) -> Self {
        Self { cmd2, cmd3 }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}{:02X}", self.cmd2, self.cmd3)
    }
}

/// Command identifiers.
pub mod command {
    use super::Command;

    pub const POWER_CONTROL: Command = Command::new(0x02, 0x00);
    pub const DMD_PARK: Command = Command::new(0x06, 0x09);
    pub const DISPLAY_BUFFER_FREEZE: Command = Command::new(0x10, 0x0A);
    pub const MAIN_STATUS: Command = Command::new(0x1A, 0x0C);
    pub const GAMMA_CORRECTION: Command = Command::new(0x1A, 0x0E);
    pub const VALIDATE_PATTERN_LUT: Command = Command::new(0x1A, 0x1A);
    pub const DISPLAY_MODE: Command = Command::new(0x1A, 0x1B);
    pub const PATTERN_INPUT_SOURCE: Command = Command::new(0x1A, 0x22);
    pub const PATTERN_TRIGGER_MODE: Command = Command::new(0x1A, 0x23);
    pub const PATTERN_DISPLAY: Command = Command::new(0x1A, 0x24);
    pub const EXPOSURE_FRAME_PERIOD: Command = Command::new(0x1A, 0x29);
    pub const PATTERN_CONFIG: Command = Command::new(0x1A, 0x31);
    pub const MAILBOX_ADDRESS: Command = Command::new(0x1A, 0x32);
    pub const OPEN_MAILBOX: Command = Command::new(0x1A, 0x33);
    pub const PATTERN_LUT_ENTRY: Command = Command::new(0x1A, 0x34);
}

/// Encode a command into the reports that carry it.
///
/// Always returns at least one report. Fails only if the payload is too
/// long for the 16-bit length field.
pub fn encode(
    direction: Direction,
    sequence: u8,
    command: Command,
    payload: &[u8],
) -> Result<Vec<Report>> {
    let length = u16::try_from(payload.len() + 2)
        .map_err(|_| Error::invalid(format!("payload of {} bytes too long", payload.len())))?;

    let mut reports = Vec::with_capacity(report_count(payload.len()));

    let mut first = [0u8; REPORT_SIZE];
    first[0] = direction.flags();
    first[1] = sequence;
    first[2..4].copy_from_slice(&length.to_le_bytes());
    first[4] = command.cmd3;
    first[5] = command.cmd2;

    let head = payload.len().min(FIRST_REPORT_PAYLOAD);
    first[HEADER_SIZE..HEADER_SIZE + head].copy_from_slice(&payload[..head]);
    reports.push(first);

    for chunk in payload[head..].chunks(REPORT_SIZE) {
        let mut report = [0u8; REPORT_SIZE];
        report[..chunk.len()].copy_from_slice(chunk);
        reports.push(report);
    }

    Ok(reports)
}

/// Number of reports needed to carry a payload of `payload_len` bytes.
pub fn report_count(payload_len: usize) -> usize {
    1 + padded_len(payload_len.saturating_sub(FIRST_REPORT_PAYLOAD)) / REPORT_SIZE
}

/// Round a byte length up to a whole number of reports.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(REPORT_SIZE) * REPORT_SIZE
}

/// Number of bytes needed to hold `bits` bits.
pub fn byte_count(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Pack the low `bits` bits of `value` into little-endian bytes.
///
/// Bits above `bits` are discarded.
pub fn pack_le(value: u64, bits: usize) -> Vec<u8> {
    let masked = if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    };
    let len = byte_count(bits).min(8);
    masked.to_le_bytes()[..len].to_vec()
}

/// Convert a frame rate to a frame period in microseconds, rounding down.
pub fn fps_to_period(fps: f64) -> Result<u32> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(Error::invalid(format!("frame rate must be positive, got {fps}")));
    }
    let period = (1.0 / fps * 1_000_000.0).floor();
    if period < 1.0 || period > u32::MAX as f64 {
        return Err(Error::invalid(format!("frame rate {fps} out of range")));
    }
    Ok(period as u32)
}

/// Payload for the exposure / frame period command: exposure then frame, both µs.
pub fn exposure_frame_period_payload(exposure_us: u32, frame_us: u32) -> Vec<u8> {
    let mut payload = pack_le(u64::from(exposure_us), 32);
    payload.extend(pack_le(u64::from(frame_us), 32));
    payload
}

/// A reply report read back from the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Flag byte; [`FLAG_REPLY_ERROR`] marks a failed command.
    pub flags: u8,
    /// Sequence byte of the command this answers.
    pub sequence: u8,
    /// Payload bytes as announced by the length field, clipped to the report.
    pub data: Vec<u8>,
}

impl Reply {
    /// Parse a reply report.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REPLY_HEADER_SIZE {
            return Err(Error::InvalidResponse);
        }
        let length = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        let end = (REPLY_HEADER_SIZE + length).min(bytes.len());
        Ok(Self {
            flags: bytes[0],
            sequence: bytes[1],
            data: bytes[REPLY_HEADER_SIZE..end].to_vec(),
        })
    }

    /// Whether the controller reported an error for the command.
    pub fn is_error(&self) -> bool {
        self.flags & FLAG_REPLY_ERROR != 0
    }
}

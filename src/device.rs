//! The DLPC350 command set.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::protocol::{self, command, Command, Direction, Reply, REPORT_SIZE};
use crate::transport::{Transport, UsbTransport};
use crate::types::{
    DisplayMode, LutEntry, Mailbox, MainStatus, PatternAction, PatternConfig, PatternInputSource,
    PowerMode, TriggerMode,
};

/// Highest mailbox offset accepted by [`Dlpc350::mailbox_set_address`].
pub const MAX_MAILBOX_ADDRESS: u8 = 127;

/// Replies to earlier commands discarded before giving up on the current one.
const MAX_STALE_REPLIES: usize = 4;

/// A DLPC350 controller reached through a [`Transport`].
///
/// Each method sends one command, reads the controller's reply and then
/// pauses for the configured command delay. Commands are never retried.
pub struct Dlpc350<T: Transport> {
    transport: T,
    command_delay: Duration,
    sequence: u8,
    last_reply: Option<Reply>,
}

impl Dlpc350<UsbTransport> {
    /// Open the first attached controller over USB.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let transport = UsbTransport::open(config)?;
        Ok(Self::new(transport).with_command_delay(config.command_delay))
    }
}

impl<T: Transport> Dlpc350<T> {
    /// Wrap a transport, using the default command delay.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            command_delay: ConnectionConfig::default().command_delay,
            sequence: 0,
            last_reply: None,
        }
    }

    /// Set the pause after each command (builder pattern).
    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    /// The reply to the most recent command, if the controller sent one.
    pub fn last_reply(&self) -> Option<&Reply> {
        self.last_reply.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Enter or leave standby (CMD 0x0200).
    ///
    /// Only enter standby after the last frame has been transferred, and leave
    /// it before sending new data.
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<()> {
        self.write(command::POWER_CONTROL, &[mode.as_byte()])
    }

    /// Park or unpark the DMD mirrors (CMD 0x0609).
    pub fn set_dmd_park(&mut self, park: bool) -> Result<()> {
        self.write(command::DMD_PARK, &[u8::from(park)])
    }

    /// Stop or resume swapping the display buffers (CMD 0x100A).
    pub fn set_buffer_freeze(&mut self, freeze: bool) -> Result<()> {
        self.write(command::DISPLAY_BUFFER_FREEZE, &[u8::from(freeze)])
    }

    /// Select video or pattern sequence display (CMD 0x1A1B).
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<()> {
        self.write(command::DISPLAY_MODE, &[mode.as_byte()])
    }

    /// Select the pattern data source (CMD 0x1A22).
    pub fn set_pattern_input_source(&mut self, source: PatternInputSource) -> Result<()> {
        self.write(command::PATTERN_INPUT_SOURCE, &[source.as_byte()])
    }

    /// Select what advances the pattern sequence (CMD 0x1A23).
    pub fn set_pattern_trigger_mode(&mut self, mode: TriggerMode) -> Result<()> {
        self.write(command::PATTERN_TRIGGER_MODE, &[mode.as_byte()])
    }

    /// Enable or disable degamma of video input (CMD 0x1A0E). Video mode only.
    pub fn set_gamma_correction(&mut self, enable: bool) -> Result<()> {
        let payload = if enable { 0x80 } else { 0x00 };
        self.write(command::GAMMA_CORRECTION, &[payload])
    }

    /// Start, pause or stop the programmed pattern sequence (CMD 0x1A24).
    pub fn pattern_display(&mut self, action: PatternAction) -> Result<()> {
        self.write(command::PATTERN_DISPLAY, &[action.as_byte()])
    }

    /// Set the pattern exposure time and frame period in µs (CMD 0x1A29).
    ///
    /// The exposure must equal the frame period or be at least 230 µs shorter.
    /// Stop the sequence first and validate the LUT afterwards.
    pub fn set_exposure_frame_period(&mut self, exposure_us: u32, frame_us: u32) -> Result<()> {
        if exposure_us > frame_us {
            return Err(Error::invalid(format!(
                "exposure {exposure_us}us exceeds frame period {frame_us}us"
            )));
        }
        let payload = protocol::exposure_frame_period_payload(exposure_us, frame_us);
        self.write(command::EXPOSURE_FRAME_PERIOD, &payload)
    }

    /// Configure LUT execution (CMD 0x1A31).
    pub fn set_pattern_config(&mut self, config: &PatternConfig) -> Result<()> {
        let payload = config.to_payload()?;
        self.write(command::PATTERN_CONFIG, &payload)
    }

    /// Set the offset within the open mailbox for the next write (CMD 0x1A32).
    pub fn mailbox_set_address(&mut self, address: u8) -> Result<()> {
        if address > MAX_MAILBOX_ADDRESS {
            return Err(Error::invalid(format!(
                "mailbox address must be 0-{MAX_MAILBOX_ADDRESS}, got {address}"
            )));
        }
        self.write(command::MAILBOX_ADDRESS, &[address])
    }

    /// Open a mailbox, or close all with [`Mailbox::Closed`] (CMD 0x1A33).
    pub fn open_mailbox(&mut self, mailbox: Mailbox) -> Result<()> {
        self.write(command::OPEN_MAILBOX, &[mailbox.as_byte()])
    }

    /// Write one pattern definition at the current mailbox address (CMD 0x1A34).
    pub fn send_pattern_lut(&mut self, entry: &LutEntry) -> Result<()> {
        let payload = entry.to_payload()?;
        self.write(command::PATTERN_LUT_ENTRY, &payload)
    }

    /// Ask the controller to check the programmed LUT (CMD 0x1A1A).
    pub fn start_pattern_lut_validate(&mut self) -> Result<()> {
        self.write(command::VALIDATE_PATTERN_LUT, &[0x00])
    }

    /// Read the main status byte (CMD 0x1A0C).
    pub fn main_status(&mut self) -> Result<MainStatus> {
        let reply = self.read(command::MAIN_STATUS, &[])?;
        let byte = reply.data.first().copied().ok_or(Error::InvalidResponse)?;
        Ok(MainStatus::from_byte(byte))
    }

    // =========================================================================
    // Framing
    // =========================================================================

    /// Send a write command. A missing or unreadable reply is logged, not fatal.
    fn write(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        let sequence = self.send(Direction::Write, command, payload)?;
        let reply = self.receive(sequence);
        self.pause();

        match reply {
            Ok(reply) => {
                let failed = reply.is_error();
                self.last_reply = Some(reply);
                if failed {
                    return Err(Error::CommandFailed {
                        cmd2: command.cmd2,
                        cmd3: command.cmd3,
                    });
                }
            }
            Err(e @ (Error::Usb(_) | Error::InvalidResponse)) => {
                warn!("No reply to command {command}: {e}");
                self.last_reply = None;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Send a read command and return the matching reply.
    fn read(&mut self, command: Command, payload: &[u8]) -> Result<Reply> {
        let sequence = self.send(Direction::Read, command, payload)?;
        let reply = self.receive(sequence);
        self.pause();
        let reply = reply?;

        self.last_reply = Some(reply.clone());
        if reply.is_error() {
            return Err(Error::CommandFailed {
                cmd2: command.cmd2,
                cmd3: command.cmd3,
            });
        }
        Ok(reply)
    }

    fn send(&mut self, direction: Direction, command: Command, payload: &[u8]) -> Result<u8> {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let reports = protocol::encode(direction, sequence, command, payload)?;
        debug!(
            "Sending {:?} command {} (seq {}, {} payload bytes, {} reports)",
            direction,
            command,
            sequence,
            payload.len(),
            reports.len()
        );
        for report in &reports {
            self.transport.write_report(report)?;
        }
        Ok(sequence)
    }

    /// Read replies until one carries `sequence`.
    ///
    /// A reply that arrived after its command timed out is still queued on
    /// the IN endpoint, so older sequence numbers are skipped.
    fn receive(&mut self, sequence: u8) -> Result<Reply> {
        for _ in 0..=MAX_STALE_REPLIES {
            let mut buf = [0u8; REPORT_SIZE];
            let len = self.transport.read_report(&mut buf)?;
            let reply = Reply::parse(&buf[..len])?;
            debug!(
                "Reply flags {:#04x} seq {} data {:02x?}",
                reply.flags, reply.sequence, reply.data
            );
            if reply.sequence == sequence {
                return Ok(reply);
            }
            debug!(
                "Skipping reply with sequence {}, expected {}",
                reply.sequence, sequence
            );
        }
        Err(Error::InvalidResponse)
    }

    fn pause(&self) {
        if !self.command_delay.is_zero() {
            thread::sleep(self.command_delay);
        }
    }
}

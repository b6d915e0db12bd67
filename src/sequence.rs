//! Multi-command procedures for switching the projector between modes.
//!
//! The methods on [`Dlpc350`] run against any transport. The free functions
//! open the first attached Lightcrafter 4500 over USB, run one procedure and
//! release the device again.

use log::info;

use crate::config::{ConnectionConfig, PatternModeConfig};
use crate::device::Dlpc350;
use crate::error::{Error, Result};
use crate::transport::{Transport, UsbTransport};
use crate::types::{
    BitDepth, DisplayMode, LutEntry, Mailbox, MainStatus, PatternAction, PatternConfig, PowerMode,
    TriggerType,
};

/// Pattern numbers selecting the bit planes of the three 8-bit video color
/// channels for a given bit depth.
pub fn pattern_numbers(bit_depth: BitDepth) -> Result<[u8; 3]> {
    match bit_depth.bits() {
        1 => Ok([7, 15, 23]),
        2 => Ok([3, 7, 11]),
        4 => Ok([1, 3, 5]),
        7 | 8 => Ok([0, 1, 2]),
        bits => Err(Error::invalid(format!(
            "no pattern layout for {bits}-bit patterns"
        ))),
    }
}

/// The LUT entries written by [`Dlpc350::enter_pattern_mode`].
///
/// The first entry waits for an external trigger, the rest follow on without one.
pub fn lut_entries(config: &PatternModeConfig) -> Result<Vec<LutEntry>> {
    config.validate()?;
    let numbers = pattern_numbers(config.bit_depth)?;

    let entries = numbers
        .iter()
        .take(config.num_patterns as usize)
        .enumerate()
        .map(|(i, &pattern_number)| {
            let trigger = if i == 0 {
                TriggerType::ExternalPositive
            } else {
                TriggerType::NoTrigger
            };
            LutEntry::new(trigger, pattern_number, config.bit_depth, config.leds)
        })
        .collect();

    Ok(entries)
}

impl<T: Transport> Dlpc350<T> {
    /// Program and start a pattern sequence.
    ///
    /// The configuration is validated before anything is sent.
    pub fn enter_pattern_mode(&mut self, config: &PatternModeConfig) -> Result<()> {
        let entries = lut_entries(config)?;
        let count = config.num_patterns;

        // Settings only change while the sequence is stopped
        self.pattern_display(PatternAction::Stop)?;
        self.set_display_mode(config.display_mode)?;
        self.set_pattern_input_source(config.input_source)?;
        self.set_pattern_config(&PatternConfig {
            lut_entries: count,
            repeat: true,
            patterns_per_trigger_out2: u16::from(count),
            image_count: 0,
        })?;
        self.set_pattern_trigger_mode(config.trigger_mode)?;
        self.set_exposure_frame_period(config.period_us, config.period_us)?;

        self.open_mailbox(Mailbox::PatternDefinition)?;
        for (address, entry) in (0u8..).zip(&entries) {
            self.mailbox_set_address(address)?;
            self.send_pattern_lut(entry)?;
        }
        self.open_mailbox(Mailbox::Closed)?;

        self.start_pattern_lut_validate()?;

        // Coming out of video mode the first start is ignored
        self.pattern_display(PatternAction::Start)?;
        self.pattern_display(PatternAction::Start)?;

        info!(
            "Pattern mode: {} patterns, {}, LEDs {:#05b}, period {}us",
            count,
            config.bit_depth,
            config.leds.bits(),
            config.period_us
        );
        Ok(())
    }

    /// Stop any pattern sequence and display live video.
    pub fn enter_video_mode(&mut self) -> Result<()> {
        self.pattern_display(PatternAction::Stop)?;
        self.set_display_mode(DisplayMode::Video)?;
        info!("Video mode");
        Ok(())
    }

    /// Stop any pattern sequence and enter standby.
    pub fn standby(&mut self) -> Result<()> {
        self.pattern_display(PatternAction::Stop)?;
        self.set_power_mode(PowerMode::Standby)?;
        info!("Standby");
        Ok(())
    }

    /// Leave standby.
    pub fn wake(&mut self) -> Result<()> {
        self.set_power_mode(PowerMode::Normal)?;
        info!("Normal power");
        Ok(())
    }

    /// Enable or disable gamma correction and read back the main status.
    pub fn apply_gamma(&mut self, enable: bool) -> Result<MainStatus> {
        self.set_gamma_correction(enable)?;
        self.main_status()
    }
}

/// Open the first attached Lightcrafter 4500 with default settings.
pub fn connect() -> Result<Dlpc350<UsbTransport>> {
    Dlpc350::open(&ConnectionConfig::default())
}

/// Put the projector into pattern sequence mode.
pub fn pattern_mode(config: &PatternModeConfig) -> Result<()> {
    config.validate()?;
    connect()?.enter_pattern_mode(config)
}

/// Put the projector into video mode.
pub fn video_mode() -> Result<()> {
    connect()?.enter_video_mode()
}

/// Put the projector into standby.
pub fn power_down() -> Result<()> {
    connect()?.standby()
}

/// Wake the projector from standby.
pub fn power_up() -> Result<()> {
    connect()?.wake()
}

/// Set gamma correction and return the resulting main status.
pub fn set_gamma(enable: bool) -> Result<MainStatus> {
    connect()?.apply_gamma(enable)
}

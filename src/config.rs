//! Connection and pattern-mode configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{self, INTERFACE, PRODUCT_ID, VENDOR_ID};
use crate::types::{BitDepth, DisplayMode, LedSelect, PatternInputSource, TriggerMode};

/// Default frame rate of the pattern sequence.
pub const DEFAULT_FPS: f64 = 222.0;

/// Frame period for [`DEFAULT_FPS`], in microseconds.
pub const DEFAULT_PERIOD_US: u32 = 4504;

/// Bit depths the pattern helper knows pattern numbers for.
pub const SUPPORTED_BIT_DEPTHS: [u8; 5] = [1, 2, 4, 7, 8];

/// Maximum patterns per sequence: one per color channel of the video input.
pub const MAX_PATTERNS: u8 = 3;

/// How to find and talk to the controller.
///
/// # Defaults
///
/// - `vendor_id` / `product_id`: `0451:6401` (Lightcrafter 4500)
/// - `interface`: 0
/// - `timeout`: 1s per USB transfer
/// - `command_delay`: 20ms pause after every command
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,

    /// Timeout for each report written or read.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis"))]
    pub timeout: Duration,

    /// Pause after each command. The controller drops commands sent back to back.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis"))]
    pub command_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            interface: INTERFACE,
            timeout: Duration::from_millis(1000),
            command_delay: Duration::from_millis(20),
        }
    }
}

impl ConnectionConfig {
    /// Target a different DLPC device (builder pattern).
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    /// Set the USB transfer timeout (builder pattern).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pause after each command (builder pattern).
    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }
}

/// Settings for switching the projector into pattern sequence mode.
///
/// The defaults display the three color channels of the incoming video as a
/// 7-bit pattern sequence with all LEDs on, triggered by VSYNC at 222 fps.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatternModeConfig {
    pub display_mode: DisplayMode,
    pub input_source: PatternInputSource,
    /// Patterns in the sequence, 1 through [`MAX_PATTERNS`].
    pub num_patterns: u8,
    pub trigger_mode: TriggerMode,
    /// Exposure and frame period in microseconds.
    pub period_us: u32,
    /// One of [`SUPPORTED_BIT_DEPTHS`].
    pub bit_depth: BitDepth,
    pub leds: LedSelect,
}

impl Default for PatternModeConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Pattern,
            input_source: PatternInputSource::Video,
            num_patterns: MAX_PATTERNS,
            trigger_mode: TriggerMode::Vsync,
            period_us: DEFAULT_PERIOD_US,
            bit_depth: BitDepth::SEVEN,
            leds: LedSelect::WHITE,
        }
    }
}

impl PatternModeConfig {
    /// Set the period from a frame rate (builder pattern).
    pub fn with_fps(mut self, fps: f64) -> Result<Self> {
        self.period_us = protocol::fps_to_period(fps)?;
        Ok(self)
    }

    /// Set the exposure and frame period in microseconds (builder pattern).
    pub fn with_period(mut self, period_us: u32) -> Self {
        self.period_us = period_us;
        self
    }

    /// Set the pattern bit depth (builder pattern).
    pub fn with_bit_depth(mut self, bits: u8) -> Result<Self> {
        self.bit_depth = BitDepth::new(bits)?;
        Ok(self)
    }

    /// Set which LEDs are lit (builder pattern).
    pub fn with_leds(mut self, leds: LedSelect) -> Self {
        self.leds = leds;
        self
    }

    /// Set the number of patterns (builder pattern).
    pub fn with_num_patterns(mut self, num_patterns: u8) -> Self {
        self.num_patterns = num_patterns;
        self
    }

    /// Set the pattern data source (builder pattern).
    pub fn with_input_source(mut self, source: PatternInputSource) -> Self {
        self.input_source = source;
        self
    }

    /// Set the trigger mode (builder pattern).
    pub fn with_trigger_mode(mut self, mode: TriggerMode) -> Self {
        self.trigger_mode = mode;
        self
    }

    /// Check the settings before anything is sent to the device.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_BIT_DEPTHS.contains(&self.bit_depth.bits()) {
            return Err(Error::invalid(format!(
                "bit depth must be one of {:?}, got {}",
                SUPPORTED_BIT_DEPTHS,
                self.bit_depth.bits()
            )));
        }
        if !(1..=MAX_PATTERNS).contains(&self.num_patterns) {
            return Err(Error::invalid(format!(
                "number of patterns must be 1-{MAX_PATTERNS}, got {}",
                self.num_patterns
            )));
        }
        if self.period_us == 0 {
            return Err(Error::invalid("period must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis().min(u64::MAX as u128) as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_period_matches_default_fps() {
        assert_eq!(protocol::fps_to_period(DEFAULT_FPS).unwrap(), DEFAULT_PERIOD_US);
        assert_eq!(PatternModeConfig::default().period_us, DEFAULT_PERIOD_US);
    }

    #[test]
    fn test_pattern_mode_defaults() {
        let config = PatternModeConfig::default();
        assert_eq!(config.display_mode, DisplayMode::Pattern);
        assert_eq!(config.input_source, PatternInputSource::Video);
        assert_eq!(config.num_patterns, 3);
        assert_eq!(config.trigger_mode, TriggerMode::Vsync);
        assert_eq!(config.bit_depth.bits(), 7);
        assert_eq!(config.leds, LedSelect::WHITE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = PatternModeConfig::default()
            .with_fps(60.0)
            .unwrap()
            .with_bit_depth(1)
            .unwrap()
            .with_leds(LedSelect::GREEN)
            .with_num_patterns(2);
        assert_eq!(config.period_us, 16666);
        assert_eq!(config.bit_depth.bits(), 1);
        assert_eq!(config.leds, LedSelect::GREEN);
        assert_eq!(config.num_patterns, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unsupported_bit_depth() {
        for bits in [3, 5, 6] {
            let config = PatternModeConfig::default().with_bit_depth(bits).unwrap();
            assert!(config.validate().is_err(), "{bits}-bit should be rejected");
        }
    }

    #[test]
    fn test_validate_rejects_pattern_count() {
        assert!(PatternModeConfig::default().with_num_patterns(0).validate().is_err());
        assert!(PatternModeConfig::default().with_num_patterns(4).validate().is_err());
        assert!(PatternModeConfig::default().with_period(0).validate().is_err());
    }

    #[test]
    fn test_connection_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.vendor_id, 0x0451);
        assert_eq!(config.product_id, 0x6401);
        assert_eq!(config.command_delay, Duration::from_millis(20));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_connection_config_serde_roundtrip() {
        let config = ConnectionConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_command_delay(Duration::ZERO);

        let json = serde_json::to_string(&config).expect("serialize to JSON");
        let restored: ConnectionConfig =
            serde_json::from_str(&json).expect("deserialize from JSON");
        assert_eq!(restored, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_pattern_mode_config_partial_json() {
        let config: PatternModeConfig =
            serde_json::from_str(r#"{"bit_depth": 1, "leds": 2, "trigger_mode": "vsync"}"#)
                .expect("deserialize from JSON");
        assert_eq!(config.bit_depth.bits(), 1);
        assert_eq!(config.leds, LedSelect::GREEN);
        assert_eq!(config.num_patterns, 3);
    }
}

//! Typed command parameters for the DLPC350.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declares a fieldless enum whose variants map to a wire byte and a name.
macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = ($value:expr, $text:expr),
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// All variants in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Value sent to the controller.
            pub fn as_byte(self) -> u8 {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Lower-case name, as accepted by `FromStr`.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        Error::invalid(format!(
                            "unknown {} '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }
    };
}

byte_enum! {
    /// Input mode of the projector.
    pub enum DisplayMode {
        /// Live video from the selected external source.
        Video = (0, "video"),
        /// Pattern sequence display.
        Pattern = (1, "pattern"),
    }
}

byte_enum! {
    /// Where pattern data comes from in pattern sequence mode.
    pub enum PatternInputSource {
        /// External video port (HDMI/FPD-link).
        Video = (0, "video"),
        /// Images stored in the controller's flash.
        Flash = (3, "flash"),
    }
}

byte_enum! {
    /// What advances the pattern sequence.
    pub enum TriggerMode {
        /// Patterns are triggered by the video VSYNC.
        Vsync = (0, "vsync"),
        /// Internal or external trigger.
        InternalOrExternal = (1, "internal-or-external"),
        /// Variable exposure, internal or external trigger.
        VariableInternalOrExternal = (3, "variable-internal-or-external"),
        /// Variable exposure, VSYNC trigger.
        VariableVsync = (4, "variable-vsync"),
    }
}

byte_enum! {
    /// Start/stop control of the programmed pattern sequence.
    pub enum PatternAction {
        /// Stop; the next start restarts from the first pattern.
        Stop = (0, "stop"),
        /// Pause; the next start re-displays the current pattern.
        Pause = (1, "pause"),
        /// Start the sequence.
        Start = (2, "start"),
    }
}

byte_enum! {
    /// Mailbox selection for LUT programming.
    pub enum Mailbox {
        /// Close all mailboxes.
        Closed = (0, "closed"),
        /// Image index configuration.
        ImageIndex = (1, "image-index"),
        /// Pattern definitions.
        PatternDefinition = (2, "pattern-definition"),
        /// Variable exposure definitions.
        VariableExposure = (3, "variable-exposure"),
    }
}

byte_enum! {
    /// Trigger for a single pattern LUT entry.
    pub enum TriggerType {
        Internal = (0, "internal"),
        ExternalPositive = (1, "external-positive"),
        ExternalNegative = (2, "external-negative"),
        /// Continue from the previous pattern without waiting for a trigger.
        NoTrigger = (3, "no-trigger"),
    }
}

byte_enum! {
    /// Power state of the controller.
    pub enum PowerMode {
        /// Normal operation; the selected source is displayed.
        Normal = (0, "normal"),
        /// Low power state with the DMD interface powered down.
        Standby = (1, "standby"),
    }
}

/// Bits per pixel of a pattern, 1 through 8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct BitDepth(u8);

impl BitDepth {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub const SEVEN: Self = Self(7);

    pub fn new(bits: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(Error::invalid(format!("bit depth must be 1-8, got {bits}")))
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        Self::new(bits)
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> u8 {
        depth.0
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.0)
    }
}

/// LEDs lit for a pattern. Bit 0 red, bit 1 green, bit 2 blue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct LedSelect(u8);

impl LedSelect {
    /// No LED (pass through).
    pub const NONE: Self = Self(0b000);
    pub const RED: Self = Self(0b001);
    pub const GREEN: Self = Self(0b010);
    pub const BLUE: Self = Self(0b100);
    pub const YELLOW: Self = Self(0b011);
    pub const MAGENTA: Self = Self(0b101);
    pub const CYAN: Self = Self(0b110);
    pub const WHITE: Self = Self(0b111);

    const MASK: u8 = 0b111;

    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Self::MASK != 0 {
            return Err(Error::invalid(format!("LED mask must fit in 3 bits, got {bits:#b}")));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LedSelect {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl TryFrom<u8> for LedSelect {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        Self::from_bits(bits)
    }
}

impl From<LedSelect> for u8 {
    fn from(leds: LedSelect) -> u8 {
        leds.0
    }
}

impl FromStr for LedSelect {
    type Err = Error;

    /// Accepts a color name (`red`, `cyan`, `white`, ...) or a number
    /// (`7`, `0b101`, `0x3`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let named = match s.as_str() {
            "none" => Some(Self::NONE),
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "yellow" => Some(Self::YELLOW),
            "magenta" => Some(Self::MAGENTA),
            "cyan" => Some(Self::CYAN),
            "white" => Some(Self::WHITE),
            _ => None,
        };
        if let Some(leds) = named {
            return Ok(leds);
        }

        let parsed = if let Some(bin) = s.strip_prefix("0b") {
            u8::from_str_radix(bin, 2)
        } else if let Some(hex) = s.strip_prefix("0x") {
            u8::from_str_radix(hex, 16)
        } else {
            s.parse()
        };
        parsed
            .map_err(|_| Error::invalid(format!("unknown LED selection '{s}'")))
            .and_then(Self::from_bits)
    }
}

/// Pattern sequence configuration (pattern display LUT control).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternConfig {
    /// Number of LUT entries, 1 through 128.
    pub lut_entries: u8,
    /// Repeat the sequence instead of running it once.
    pub repeat: bool,
    /// Patterns displayed per TRIG_OUT2 pulse, 1 through 256.
    pub patterns_per_trigger_out2: u16,
    /// Number of image index LUT entries, 0 through 63. Only used with flash input.
    pub image_count: u8,
}

impl PatternConfig {
    /// Encode the four payload bytes.
    pub fn to_payload(&self) -> Result<[u8; 4]> {
        if !(1..=128).contains(&self.lut_entries) {
            return Err(Error::invalid(format!(
                "LUT entries must be 1-128, got {}",
                self.lut_entries
            )));
        }
        if !(1..=256).contains(&self.patterns_per_trigger_out2) {
            return Err(Error::invalid(format!(
                "patterns per TRIG_OUT2 must be 1-256, got {}",
                self.patterns_per_trigger_out2
            )));
        }
        if self.image_count > 0x3F {
            return Err(Error::invalid(format!(
                "image count must be 0-63, got {}",
                self.image_count
            )));
        }

        Ok([
            (self.lut_entries - 1) & 0x7F,
            u8::from(self.repeat),
            (self.patterns_per_trigger_out2 - 1) as u8,
            self.image_count & 0x3F,
        ])
    }
}

/// One pattern definition written to the pattern LUT mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LutEntry {
    pub trigger: TriggerType,
    /// Pattern number within the image, 0 through 63.
    ///
    /// 1-bit patterns go up to 24. For 1-bit patterns, 25 inserts a white
    /// fill (black when inverted). 0x3F displays nothing.
    pub pattern_number: u8,
    pub bit_depth: BitDepth,
    pub leds: LedSelect,
    pub invert: bool,
    /// Insert a black fill after the pattern. Needs 230 µs before the next pattern.
    pub insert_black: bool,
    pub buffer_swap: bool,
    /// Keep TRIG_OUT1 high from the previous pattern, sharing its exposure.
    pub trigger_out_prev: bool,
}

impl LutEntry {
    /// Entry with all flags cleared.
    pub fn new(trigger: TriggerType, pattern_number: u8, bit_depth: BitDepth, leds: LedSelect) -> Self {
        Self {
            trigger,
            pattern_number,
            bit_depth,
            leds,
            invert: false,
            insert_black: false,
            buffer_swap: false,
            trigger_out_prev: false,
        }
    }

    /// Encode the three payload bytes.
    pub fn to_payload(&self) -> Result<[u8; 3]> {
        if self.pattern_number > 0x3F {
            return Err(Error::invalid(format!(
                "pattern number must be 0-63, got {}",
                self.pattern_number
            )));
        }
        if self.trigger_out_prev && self.insert_black {
            return Err(Error::invalid(
                "black fill cannot be combined with a shared trigger out",
            ));
        }

        let flags = u8::from(self.trigger_out_prev) << 3
            | u8::from(self.buffer_swap) << 2
            | u8::from(self.insert_black) << 1
            | u8::from(self.invert);

        Ok([
            self.pattern_number << 2 | self.trigger.as_byte(),
            self.leds.bits() << 4 | self.bit_depth.bits(),
            flags,
        ])
    }
}

/// Decoded main status byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MainStatus {
    pub dmd_parked: bool,
    pub sequencer_running: bool,
    pub buffer_frozen: bool,
    pub gamma_enabled: bool,
}

impl MainStatus {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            dmd_parked: byte & 0x01 != 0,
            sequencer_running: byte & 0x02 != 0,
            buffer_frozen: byte & 0x04 != 0,
            gamma_enabled: byte & 0x08 != 0,
        }
    }
}

impl fmt::Display for MainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DMD micromirrors are {}",
            if self.dmd_parked { "parked" } else { "not parked" }
        )?;
        writeln!(
            f,
            "Sequencer is {}",
            if self.sequencer_running { "running normally" } else { "stopped" }
        )?;
        writeln!(
            f,
            "Frame buffer is {}",
            if self.buffer_frozen { "frozen" } else { "not frozen" }
        )?;
        write!(
            f,
            "Gamma correction is {}",
            if self.gamma_enabled { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Enum Tests
    // ==========================================================================

    #[test]
    fn test_enum_wire_values() {
        assert_eq!(DisplayMode::Video.as_byte(), 0);
        assert_eq!(DisplayMode::Pattern.as_byte(), 1);
        assert_eq!(PatternInputSource::Flash.as_byte(), 3);
        assert_eq!(PatternAction::Start.as_byte(), 2);
        assert_eq!(Mailbox::PatternDefinition.as_byte(), 2);
        assert_eq!(TriggerType::NoTrigger.as_byte(), 3);
        assert_eq!(PowerMode::Standby.as_byte(), 1);
    }

    #[test]
    fn test_enum_parse_by_name() {
        assert_eq!("pattern".parse::<DisplayMode>().unwrap(), DisplayMode::Pattern);
        assert_eq!(" Flash ".parse::<PatternInputSource>().unwrap(), PatternInputSource::Flash);
        assert_eq!("VSYNC".parse::<TriggerMode>().unwrap(), TriggerMode::Vsync);
        assert!("hdmi".parse::<PatternInputSource>().is_err());
    }

    #[test]
    fn test_enum_display_matches_parse() {
        for action in PatternAction::ALL {
            assert_eq!(action.to_string().parse::<PatternAction>().unwrap(), *action);
        }
    }

    // ==========================================================================
    // BitDepth / LedSelect Tests
    // ==========================================================================

    #[test]
    fn test_bit_depth_range() {
        assert!(BitDepth::new(0).is_err());
        assert!(BitDepth::new(9).is_err());
        assert_eq!(BitDepth::new(8).unwrap().bits(), 8);
    }

    #[test]
    fn test_led_select_composition() {
        assert_eq!(LedSelect::RED | LedSelect::GREEN, LedSelect::YELLOW);
        assert_eq!(LedSelect::RED | LedSelect::GREEN | LedSelect::BLUE, LedSelect::WHITE);
        assert!(LedSelect::CYAN.contains(LedSelect::BLUE));
        assert!(!LedSelect::CYAN.contains(LedSelect::RED));
        assert!(LedSelect::from_bits(0b1000).is_err());
    }

    #[test]
    fn test_led_select_parse() {
        assert_eq!("magenta".parse::<LedSelect>().unwrap(), LedSelect::MAGENTA);
        assert_eq!("7".parse::<LedSelect>().unwrap(), LedSelect::WHITE);
        assert_eq!("0b010".parse::<LedSelect>().unwrap(), LedSelect::GREEN);
        assert_eq!("0x4".parse::<LedSelect>().unwrap(), LedSelect::BLUE);
        assert!("8".parse::<LedSelect>().is_err());
        assert!("purple".parse::<LedSelect>().is_err());
    }

    // ==========================================================================
    // Payload Tests
    // ==========================================================================

    #[test]
    fn test_pattern_config_payload() {
        let config = PatternConfig {
            lut_entries: 3,
            repeat: true,
            patterns_per_trigger_out2: 3,
            image_count: 0,
        };
        assert_eq!(config.to_payload().unwrap(), [0x02, 0x01, 0x02, 0x00]);

        let config = PatternConfig {
            lut_entries: 128,
            repeat: false,
            patterns_per_trigger_out2: 256,
            image_count: 63,
        };
        assert_eq!(config.to_payload().unwrap(), [0x7F, 0x00, 0xFF, 0x3F]);
    }

    #[test]
    fn test_pattern_config_rejects_out_of_range() {
        let base = PatternConfig {
            lut_entries: 1,
            repeat: true,
            patterns_per_trigger_out2: 1,
            image_count: 0,
        };
        assert!(PatternConfig { lut_entries: 0, ..base }.to_payload().is_err());
        assert!(PatternConfig { lut_entries: 129, ..base }.to_payload().is_err());
        assert!(PatternConfig { patterns_per_trigger_out2: 0, ..base }.to_payload().is_err());
        assert!(PatternConfig { patterns_per_trigger_out2: 257, ..base }.to_payload().is_err());
        assert!(PatternConfig { image_count: 64, ..base }.to_payload().is_err());
    }

    #[test]
    fn test_lut_entry_payload() {
        let entry = LutEntry::new(
            TriggerType::ExternalPositive,
            7,
            BitDepth::new(1).unwrap(),
            LedSelect::WHITE,
        );
        // byte0: 7 << 2 | 1, byte1: 0b111 << 4 | 1
        assert_eq!(entry.to_payload().unwrap(), [0x1D, 0x71, 0x00]);

        let entry = LutEntry {
            invert: true,
            buffer_swap: true,
            trigger_out_prev: true,
            ..LutEntry::new(TriggerType::NoTrigger, 2, BitDepth::new(7).unwrap(), LedSelect::RED)
        };
        assert_eq!(entry.to_payload().unwrap(), [0x0B, 0x17, 0x0D]);
    }

    #[test]
    fn test_lut_entry_rejects_invalid() {
        let depth = BitDepth::new(1).unwrap();
        let entry = LutEntry::new(TriggerType::Internal, 64, depth, LedSelect::RED);
        assert!(entry.to_payload().is_err());

        let entry = LutEntry {
            insert_black: true,
            trigger_out_prev: true,
            ..LutEntry::new(TriggerType::Internal, 0, depth, LedSelect::RED)
        };
        assert!(entry.to_payload().is_err());
    }

    #[test]
    fn test_main_status_bits() {
        let status = MainStatus::from_byte(0b1010);
        assert!(!status.dmd_parked);
        assert!(status.sequencer_running);
        assert!(!status.buffer_frozen);
        assert!(status.gamma_enabled);

        let text = status.to_string();
        assert!(text.contains("not parked"));
        assert!(text.contains("running normally"));
        assert!(text.contains("Gamma correction is enabled"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_pattern_config_serde_roundtrip() {
        let config = PatternConfig {
            lut_entries: 3,
            repeat: true,
            patterns_per_trigger_out2: 3,
            image_count: 0,
        };
        let json = serde_json::to_string(&config).expect("serialize to JSON");
        let restored: PatternConfig = serde_json::from_str(&json).expect("deserialize from JSON");
        assert_eq!(restored, config);

        let leds: LedSelect = serde_json::from_str("5").expect("deserialize LED mask");
        assert_eq!(leds, LedSelect::MAGENTA);
        assert!(serde_json::from_str::<BitDepth>("9").is_err());
    }
}

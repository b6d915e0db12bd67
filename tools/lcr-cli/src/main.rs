//! Command-line control of a Lightcrafter 4500.
//!
//! Run with: `cargo run -p lcr-cli -- pattern --fps 120 --bit-depth 1 --leds green`

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lcr4500::{
    ConnectionConfig, Dlpc350, LedSelect, PatternInputSource, PatternModeConfig, TriggerMode,
};

#[derive(Parser)]
#[command(about = "Control a TI Lightcrafter 4500 (DLPC350) over USB")]
struct Args {
    /// USB product ID of the controller
    #[arg(long, value_parser = parse_hex_u16, default_value = "6401")]
    product_id: u16,

    /// Pause after each command, in milliseconds
    #[arg(long, default_value_t = 20)]
    delay_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wake the projector from standby
    PowerUp,
    /// Stop any pattern sequence and enter standby
    PowerDown,
    /// Display live video
    Video,
    /// Program and start a pattern sequence
    Pattern(PatternArgs),
    /// Enable or disable gamma correction (video mode only)
    Gamma {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enable: bool,
    },
    /// Print the controller's main status
    Status,
    /// Count attached controllers
    List,
}

#[derive(clap::Args)]
struct PatternArgs {
    /// Load settings from a JSON file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per second
    #[arg(long, conflicts_with = "period_us")]
    fps: Option<f64>,

    /// Exposure and frame period in microseconds
    #[arg(long)]
    period_us: Option<u32>,

    /// Bits per pattern (1, 2, 4, 7 or 8)
    #[arg(long)]
    bit_depth: Option<u8>,

    /// LEDs to light: a color name or a 3-bit mask (b0 red, b1 green, b2 blue)
    #[arg(long)]
    leds: Option<LedSelect>,

    /// Number of patterns (1-3)
    #[arg(long)]
    num_patterns: Option<u8>,

    /// Pattern data source (video, flash)
    #[arg(long)]
    input: Option<PatternInputSource>,

    /// Trigger mode (vsync, internal-or-external, ...)
    #[arg(long)]
    trigger: Option<TriggerMode>,
}

impl PatternArgs {
    fn to_config(&self) -> Result<PatternModeConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => PatternModeConfig::default(),
        };

        if let Some(fps) = self.fps {
            config = config.with_fps(fps)?;
        }
        if let Some(period) = self.period_us {
            config = config.with_period(period);
        }
        if let Some(bits) = self.bit_depth {
            config = config.with_bit_depth(bits)?;
        }
        if let Some(leds) = self.leds {
            config = config.with_leds(leds);
        }
        if let Some(n) = self.num_patterns {
            config = config.with_num_patterns(n);
        }
        if let Some(input) = self.input {
            config = config.with_input_source(input);
        }
        if let Some(trigger) = self.trigger {
            config = config.with_trigger_mode(trigger);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex ID '{s}': {e}"))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let connection = ConnectionConfig::default()
        .with_ids(lcr4500::protocol::VENDOR_ID, args.product_id)
        .with_command_delay(Duration::from_millis(args.delay_ms));

    if let Command::List = args.command {
        let count = lcr4500::transport::count_devices(connection.vendor_id, connection.product_id)?;
        println!(
            "{count} device(s) with ID {:04x}:{:04x}",
            connection.vendor_id, connection.product_id
        );
        return Ok(());
    }

    if let Command::Pattern(pattern_args) = &args.command {
        // Validate before touching the device
        let config = pattern_args.to_config()?;
        let mut lcr = Dlpc350::open(&connection)?;
        lcr.enter_pattern_mode(&config)?;
        println!(
            "Pattern mode: {} x {} at {}us",
            config.num_patterns, config.bit_depth, config.period_us
        );
        return Ok(());
    }

    let mut lcr = Dlpc350::open(&connection)?;

    match args.command {
        Command::PowerUp => lcr.wake()?,
        Command::PowerDown => lcr.standby()?,
        Command::Video => lcr.enter_video_mode()?,
        Command::Gamma { enable } => {
            let status = lcr.apply_gamma(enable)?;
            println!("{status}");
        }
        Command::Status => {
            let status = lcr.main_status()?;
            println!("{status}");
        }
        Command::List | Command::Pattern(_) => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcr4500::DisplayMode;
    use tempfile::TempDir;

    fn pattern_args(argv: &[&str]) -> PatternArgs {
        let mut full = vec!["lcr-cli", "pattern"];
        full.extend_from_slice(argv);
        match Args::try_parse_from(full).unwrap().command {
            Command::Pattern(args) => args,
            _ => panic!("expected the pattern subcommand"),
        }
    }

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("6401").unwrap(), 0x6401);
        assert_eq!(parse_hex_u16("0x6401").unwrap(), 0x6401);
        assert_eq!(parse_hex_u16("0X6401").unwrap(), 0x6401);
        assert_eq!(parse_hex_u16("0xffff").unwrap(), 0xFFFF);
        assert!(parse_hex_u16("0x").is_err());
        assert!(parse_hex_u16("10000").is_err());
        assert!(parse_hex_u16("xyz").is_err());
    }

    #[test]
    fn test_pattern_defaults_without_flags() {
        let config = pattern_args(&[]).to_config().unwrap();
        assert_eq!(config, PatternModeConfig::default());
    }

    #[test]
    fn test_pattern_flags() {
        let config = pattern_args(&["--fps", "60", "--bit-depth", "1", "--leds", "green"])
            .to_config()
            .unwrap();
        assert_eq!(config.period_us, 16666);
        assert_eq!(config.bit_depth.bits(), 1);
        assert_eq!(config.leds, LedSelect::GREEN);
    }

    #[test]
    fn test_flags_override_json_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pattern.json");
        fs::write(
            &path,
            r#"{"num_patterns": 2, "period_us": 10000, "bit_depth": 8, "input_source": "flash"}"#,
        )
        .unwrap();

        let path = path.to_str().unwrap();
        let config = pattern_args(&["--config", path, "--period-us", "5000", "--trigger", "vsync"])
            .to_config()
            .unwrap();

        // From the file
        assert_eq!(config.num_patterns, 2);
        assert_eq!(config.bit_depth.bits(), 8);
        assert_eq!(config.input_source, PatternInputSource::Flash);
        assert_eq!(config.display_mode, DisplayMode::Pattern);
        // From the flags
        assert_eq!(config.period_us, 5000);
        assert_eq!(config.trigger_mode, TriggerMode::Vsync);
    }

    #[test]
    fn test_invalid_pattern_settings_are_rejected() {
        assert!(pattern_args(&["--num-patterns", "4"]).to_config().is_err());
        assert!(pattern_args(&["--bit-depth", "3"]).to_config().is_err());
        assert!(pattern_args(&["--fps", "0"]).to_config().is_err());
        assert!(pattern_args(&["--config", "/nonexistent/pattern.json"])
            .to_config()
            .is_err());
    }

    #[test]
    fn test_fps_conflicts_with_period() {
        let result = Args::try_parse_from([
            "lcr-cli", "pattern", "--fps", "60", "--period-us", "5000",
        ]);
        assert!(result.is_err());
    }
}

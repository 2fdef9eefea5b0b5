//! CLI subcommands: discovery, colors, patterns, watchdog, configuration.

mod color_cmd;
mod config_cmd;
mod devices;
mod pattern_cmd;
mod tickle_cmd;
mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use blink1_lib::color::{self, Rgb};
pub(super) use blink1_lib::config::Config;
pub(super) use blink1_lib::device::{self, DeviceInfo, DiscoveredDevice, HidHandle};
pub(super) use blink1_lib::error::Result;
pub(super) use blink1_lib::{Controller, LedIndex, PatternState};

const PADDING: usize = 2;

/// How often long-running commands check for Ctrl+C.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub json: bool,
    pub config_path: Option<PathBuf>,
}

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{text}");
    Ok(())
}

/// Load config from `custom_path` or the default location, logging any
/// parse warnings and validation problems.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("[config] {w}");
    }
    if let Err(errors) = config.validate() {
        for e in &errors {
            log::warn!("[config] {e}");
        }
    }
    config
}

pub(super) fn open_controller(config: &Config) -> Result<Controller> {
    let ctl = Controller::open_with_config(config)?;
    log::info!("opened {ctl}");
    Ok(ctl)
}

/// Close `ctl` once Ctrl+C is pressed, waking any blocked call on it.
///
/// The watcher exits on its own when the controller is closed first.
pub(super) fn close_on_interrupt<H: HidHandle + 'static>(ctl: &Arc<Controller<H>>) {
    close_when_cleared(ctl, &RUNNING);
}

/// Close `ctl` once `running` goes false.
fn close_when_cleared<H: HidHandle + 'static>(ctl: &Arc<Controller<H>>, running: &'static AtomicBool) {
    let ctl = Arc::clone(ctl);
    let spawned = std::thread::Builder::new()
        .name("blink1-interrupt".into())
        .spawn(move || {
            while running.load(Ordering::SeqCst) && !ctl.is_closed() {
                std::thread::sleep(POLL_INTERVAL);
            }
            ctl.close();
        });
    if let Err(e) = spawned {
        log::warn!("Ctrl+C watcher not started: {e}");
    }
}

/// Parse an LED selector: 0 = all, 1 = top/first, 2 = bottom/second.
pub(super) fn parse_led(s: &str) -> std::result::Result<LedIndex, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "all" => return Ok(LedIndex::All),
        "top" | "first" => return Ok(LedIndex::First),
        "bottom" | "second" => return Ok(LedIndex::Second),
        _ => {}
    }
    s.trim()
        .parse::<u8>()
        .ok()
        .and_then(LedIndex::from_byte)
        .ok_or_else(|| format!("invalid LED '{s}' (use 0, 1, 2, all, top or bottom)"))
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DiscoveredDevice>,
}

#[derive(Serialize)]
pub(super) struct VersionOutput {
    pub cli_version: String,
    pub device: DeviceInfo,
    pub firmware: u16,
}

#[derive(Serialize)]
pub(super) struct ColorOutput {
    pub led: LedIndex,
    pub color: Rgb,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub(super) struct PatternLineJson {
    pub position: usize,
    pub color: Rgb,
    pub led: LedIndex,
    pub fade_ms: u128,
}

#[derive(Serialize)]
pub(super) struct ReadPatternOutput {
    pub capacity: usize,
    pub lines: Vec<PatternLineJson>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List connected blink(1) devices
    Devices,

    /// Show device details and firmware version
    Version,

    /// Fade to a color
    Fade {
        /// Color: #RRGGBB, #RGB or a name like "red"
        color: String,
        /// LED to change: 0/all, 1/top, 2/bottom
        #[arg(long, default_value = "0", value_parser = parse_led)]
        led: LedIndex,
        /// Fade time in milliseconds (default: default_fade_ms from config)
        #[arg(long)]
        time: Option<u64>,
    },

    /// Set all LEDs to a color immediately
    Set {
        /// Color: #RRGGBB, #RGB or a name like "red"
        color: String,
    },

    /// Read the color an LED is showing
    Read {
        /// LED to read: 0/all, 1/top, 2/bottom
        #[arg(long, default_value = "0", value_parser = parse_led)]
        led: LedIndex,
    },

    /// Load a sequence into pattern RAM and play it
    Play {
        /// States as "#RRGGBBL<led>T<ms>" joined by ';', e.g. "#FF0000L0T500;#0000FFL0T500"
        sequence: String,
        /// First pattern position
        #[arg(long, default_value_t = 0)]
        start: u8,
        /// Last pattern position (0 = last line)
        #[arg(long, default_value_t = 0)]
        end: u8,
        /// Times to play the loop (0 = forever)
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Wait until the pattern finishes (Ctrl+C to stop waiting)
        #[arg(long)]
        wait: bool,
    },

    /// Show the pattern play state
    State,

    /// Dump every line of pattern RAM
    ReadPattern,

    /// Save pattern RAM to flash (plays at power-up)
    Save,

    /// Stop any playing pattern and turn the LEDs off
    Stop,

    /// Keep the server-tickle watchdog armed until Ctrl+C
    Tickle {
        /// First pattern position played if the host stops tickling
        #[arg(long, default_value_t = 0)]
        start: u8,
        /// Last pattern position (0 = last line)
        #[arg(long, default_value_t = 0)]
        end: u8,
        /// Keep the current pattern playing while armed
        #[arg(long)]
        keep: bool,
    },

    /// Send the diagnostic echo report
    Test,

    /// Show current configuration and file path
    Config,
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, opts: &GlobalOpts) -> Result<()> {
    let json = opts.json;
    let custom_path = opts.config_path.as_deref();

    if let Command::Devices = cmd {
        return devices::cmd_devices(json);
    }
    if let Command::Config = cmd {
        return config_cmd::cmd_config(json, custom_path);
    }

    let config = load_config(custom_path);
    let ctl = open_controller(&config)?;

    match cmd {
        Command::Devices | Command::Config => Ok(()),
        Command::Version => version::cmd_version(&ctl, json),
        Command::Fade { color, led, time } => {
            if json {
                warn_json_unsupported("fade");
            }
            let fade = time.map_or_else(|| config.default_fade(), Duration::from_millis);
            color_cmd::cmd_fade(ctl, &color, led, fade)
        }
        Command::Set { color } => {
            if json {
                warn_json_unsupported("set");
            }
            color_cmd::cmd_set(&ctl, &color)
        }
        Command::Read { led } => color_cmd::cmd_read(&ctl, led, json),
        Command::Play {
            sequence,
            start,
            end,
            repeat,
            wait,
        } => {
            if json {
                warn_json_unsupported("play");
            }
            let args = pattern_cmd::PlayArgs {
                sequence,
                start,
                end,
                repeat,
                wait,
            };
            pattern_cmd::cmd_play(ctl, args)
        }
        Command::State => pattern_cmd::cmd_state(&ctl, json),
        Command::ReadPattern => pattern_cmd::cmd_read_pattern(&ctl, json),
        Command::Save => {
            if json {
                warn_json_unsupported("save");
            }
            pattern_cmd::cmd_save(&ctl)
        }
        Command::Stop => {
            if json {
                warn_json_unsupported("stop");
            }
            pattern_cmd::cmd_stop(&ctl)
        }
        Command::Tickle { start, end, keep } => {
            if json {
                warn_json_unsupported("tickle");
            }
            tickle_cmd::cmd_tickle(&ctl, start, end, keep)
        }
        Command::Test => {
            if json {
                warn_json_unsupported("test");
            }
            version::cmd_test(&ctl)
        }
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        // Indent key needs +2 for the prefix
        let w = kv_width(&["A:"], &["Very long indent key:"]);
        // "Very long indent key:" = 21 + PADDING + 2 = 25
        assert_eq!(w, 25);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Top:"], &["Indent:"]);
        let top = format_kv("Top:", "V", w);
        let indent = format!("  {:<width$}{}", "Indent:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_exact_width() {
        // "ExactWidth:" is 11 chars, wider than 10: no padding added
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn parse_led_numbers() {
        assert_eq!(parse_led("0"), Ok(LedIndex::All));
        assert_eq!(parse_led("1"), Ok(LedIndex::First));
        assert_eq!(parse_led(" 2 "), Ok(LedIndex::Second));
    }

    #[test]
    fn parse_led_names() {
        assert_eq!(parse_led("ALL"), Ok(LedIndex::All));
        assert_eq!(parse_led("top"), Ok(LedIndex::First));
        assert_eq!(parse_led("Bottom"), Ok(LedIndex::Second));
    }

    #[test]
    fn parse_led_rejects_out_of_range() {
        assert!(parse_led("3").is_err());
        assert!(parse_led("-1").is_err());
        assert!(parse_led("middle").unwrap_err().contains("middle"));
    }
}


#[cfg(test)]
mod command_tests {
    use super::*;
    use blink1_lib::LightState;
    use blink1_lib::device::mock;

    #[test]
    fn cleared_flag_wakes_blocked_fade() {
        static FLAG: AtomicBool = AtomicBool::new(true);
        let (dev, _mock) = mock::device(2);
        let ctl = Arc::new(Controller::new(dev));
        close_when_cleared(&ctl, &FLAG);

        let (tx, rx) = std::sync::mpsc::channel();
        {
            let ctl = Arc::clone(&ctl);
            std::thread::spawn(move || {
                let state = LightState::rgb(255, 0, 0, Duration::from_secs(600), LedIndex::All);
                let _ = tx.send(ctl.play_state_blocking(&state));
            });
        }
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        FLAG.store(false, Ordering::SeqCst);
        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(result.unwrap_err().is_closed());
        assert!(ctl.is_closed());
    }

    #[test]
    fn short_fade_completes_and_closes() {
        let (dev, mock) = mock::device(2);
        color_cmd::cmd_fade(Controller::new(dev), "blue", LedIndex::All, Duration::from_millis(20))
            .unwrap();
        assert_eq!(mock.color(), (0, 0, 255));
    }

    #[test]
    fn load_config_from_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_fade_ms = 750\n").unwrap();
        let config = load_config(Some(&path));
        assert_eq!(config.default_fade_ms, 750);
        assert!(config.gamma_correction);
    }

    #[test]
    fn load_config_missing_custom_path_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn cmd_config_succeeds_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(config_cmd::cmd_config(false, Some(&path)).is_ok());
        assert!(config_cmd::cmd_config(true, Some(&path)).is_ok());
    }
}

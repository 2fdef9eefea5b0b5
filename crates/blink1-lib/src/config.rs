//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::ControllerOptions;
use crate::error::{Blink1Error, Result};
use crate::protocol::{MIN_TIME, OPS_INTERVAL, OPS_TRY_TIMES, TICKLE_PERIOD};
use crate::retry::RetryPolicy;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# blink1 configuration. Changes made outside blink1-cli may be overwritten.\n\n";

/// Longest pacing interval accepted between pattern writes.
const MAX_OPS_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Preferred device serial number. Empty = first device found.
    #[serde(default)]
    pub device_serial: String,

    /// Gamma-correct colors before writing them to the device.
    #[serde(default = "default_true")]
    pub gamma_correction: bool,

    /// Auto-tickle re-arm period in milliseconds. The device timeout is 150% of this.
    #[serde(default = "default_tickle_period_ms")]
    pub tickle_period_ms: u64,

    /// Pause between consecutive pattern line writes, in milliseconds.
    #[serde(default = "default_ops_interval_ms")]
    pub ops_interval_ms: u64,

    /// Attempts per pattern line read or write, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fade time used by the CLI when none is given, in milliseconds.
    #[serde(default)]
    pub default_fade_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_tickle_period_ms() -> u64 {
    TICKLE_PERIOD.as_millis() as u64
}
fn default_ops_interval_ms() -> u64 {
    OPS_INTERVAL.as_millis() as u64
}
fn default_retry_attempts() -> u32 {
    OPS_TRY_TIMES
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_serial: String::new(),
            gamma_correction: true,
            tickle_period_ms: default_tickle_period_ms(),
            ops_interval_ms: default_ops_interval_ms(),
            retry_attempts: default_retry_attempts(),
            default_fade_ms: 0,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `retry_attempts` is zero.
    ZeroRetryAttempts,
    /// `tickle_period_ms` is below the device's time resolution.
    TicklePeriodTooShort(u64),
    /// `ops_interval_ms` is long enough to stall pattern loads.
    OpsIntervalTooLong(u64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroRetryAttempts => {
                write!(f, "retry_attempts must be at least 1")
            }
            ValidationError::TicklePeriodTooShort(ms) => write!(
                f,
                "tickle_period_ms must be at least {}, got {ms}",
                MIN_TIME.as_millis()
            ),
            ValidationError::OpsIntervalTooLong(ms) => write!(
                f,
                "ops_interval_ms must be at most {MAX_OPS_INTERVAL_MS}, got {ms}"
            ),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("blink1"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.retry_attempts == 0 {
            errors.push(ValidationError::ZeroRetryAttempts);
        }
        if self.tickle_period_ms < MIN_TIME.as_millis() as u64 {
            errors.push(ValidationError::TicklePeriodTooShort(self.tickle_period_ms));
        }
        if self.ops_interval_ms > MAX_OPS_INTERVAL_MS {
            errors.push(ValidationError::OpsIntervalTooLong(self.ops_interval_ms));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate) as a crate error, all problems joined.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            Blink1Error::Config(joined.join("; "))
        })
    }

    pub fn default_fade(&self) -> Duration {
        Duration::from_millis(self.default_fade_ms)
    }

    /// Controller options described by this config.
    ///
    /// The retry cooldown follows the pacing interval.
    pub fn controller_options(&self) -> ControllerOptions {
        let ops_interval = Duration::from_millis(self.ops_interval_ms);
        ControllerOptions {
            gamma: self.gamma_correction,
            tickle_period: Duration::from_millis(self.tickle_period_ms),
            retry: RetryPolicy::new(self.retry_attempts, ops_interval),
            ops_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Config defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.device_serial, "");
        assert!(c.gamma_correction);
        assert_eq!(c.tickle_period_ms, 2000);
        assert_eq!(c.ops_interval_ms, 30);
        assert_eq!(c.retry_attempts, 3);
        assert_eq!(c.default_fade_ms, 0);
    }

    #[test]
    fn default_options_match_controller_defaults() {
        assert_eq!(
            Config::default().controller_options(),
            ControllerOptions::default()
        );
    }

    #[test]
    fn serialize_roundtrip() {
        let c = Config {
            device_serial: "2000ABCD".into(),
            gamma_correction: false,
            tickle_period_ms: 500,
            ..Config::default()
        };
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2, c);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("retry_attempts = 5").unwrap();
        assert_eq!(c.retry_attempts, 5);
        // Missing fields get defaults
        assert!(c.gamma_correction);
        assert_eq!(c.tickle_period_ms, 2000);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn wrong_type_toml_is_rejected() {
        // A valid TOML key with the wrong type (string where bool expected)
        let result: std::result::Result<Config, _> =
            toml::from_str("gamma_correction = \"not a bool\"");
        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert!(path.parent().unwrap().ends_with("blink1"));
        }
    }

    // ── controller_options ──

    #[test]
    fn controller_options_from_config() {
        let c = Config {
            gamma_correction: false,
            tickle_period_ms: 100,
            ops_interval_ms: 5,
            retry_attempts: 7,
            ..Config::default()
        };
        let o = c.controller_options();
        assert!(!o.gamma);
        assert_eq!(o.tickle_period, Duration::from_millis(100));
        assert_eq!(o.ops_interval, Duration::from_millis(5));
        assert_eq!(o.retry, RetryPolicy::new(7, Duration::from_millis(5)));
    }

    #[test]
    fn default_fade_duration() {
        let c = Config {
            default_fade_ms: 250,
            ..Config::default()
        };
        assert_eq!(c.default_fade(), Duration::from_millis(250));
    }

    // ── validate ──

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_collects_all_errors() {
        let c = Config {
            retry_attempts: 0,
            tickle_period_ms: 5,
            ops_interval_ms: 5000,
            ..Config::default()
        };
        let errors = c.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroRetryAttempts,
                ValidationError::TicklePeriodTooShort(5),
                ValidationError::OpsIntervalTooLong(5000),
            ]
        );
    }

    #[test]
    fn check_maps_errors_to_config_error() {
        assert!(Config::default().check().is_ok());
        let c = Config {
            retry_attempts: 0,
            tickle_period_ms: 0,
            ..Config::default()
        };
        let err = c.check().unwrap_err();
        assert!(matches!(err, Blink1Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Config error: retry_attempts must be at least 1; tickle_period_ms must be at least 10, got 0"
        );
    }

    #[test]
    fn validation_error_display() {
        assert_eq!(
            ValidationError::TicklePeriodTooShort(5).to_string(),
            "tickle_period_ms must be at least 10, got 5"
        );
        assert_eq!(
            ValidationError::ZeroRetryAttempts.to_string(),
            "retry_attempts must be at least 1"
        );
    }

    // ── save_to / load_from ──

    #[test]
    fn save_to_load_from_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            device_serial: "ABC".into(),
            default_fade_ms: 300,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded, config);
    }

    #[test]
    fn save_to_includes_header_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# blink1 configuration"));
    }

    #[test]
    fn save_to_cleans_up_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_from_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
    }
}

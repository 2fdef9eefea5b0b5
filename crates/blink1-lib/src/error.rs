//! Unified error type for the blink1-lib crate.
//!
//! [`Blink1Error`] wraps transport errors ([`DeviceError`]) and the
//! argument and parsing errors raised above the transport. `From` impls let
//! `?` carry device and I/O errors up into controller calls.

use std::fmt;
use std::time::Duration;

use crate::device::DeviceError;

/// Unified error type for blink1-lib operations.
#[derive(Debug)]
pub enum Blink1Error {
    /// Transport error (open, closed, read or write failure).
    Device(DeviceError),
    /// Standard I/O error (config persistence, thread spawn).
    Io(std::io::Error),
    /// Pattern position range outside the device's pattern RAM.
    InvalidRange { start: u8, end: u8, max: u8 },
    /// Repeat count above what the device can count.
    InvalidRepeat(u32),
    /// Watchdog timeout below the device's time resolution.
    InvalidTimeout(Duration),
    /// Reading or writing one pattern line failed after all retries.
    PatternLine { pos: u8, source: DeviceError },
    /// Color parsing error.
    Color(String),
    /// Light state or sequence text parsing error.
    State(String),
    /// Configuration validation error.
    Config(String),
}

impl fmt::Display for Blink1Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blink1Error::Device(e) => write!(f, "{e}"),
            Blink1Error::Io(e) => write!(f, "I/O error: {e}"),
            Blink1Error::InvalidRange { start, end, max } => write!(
                f,
                "Invalid pattern range: start={start} end={end} (device holds {max} positions)"
            ),
            Blink1Error::InvalidRepeat(n) => {
                write!(f, "Invalid repeat count: {n} (max {})", crate::protocol::MAX_REPEAT)
            }
            Blink1Error::InvalidTimeout(d) => write!(
                f,
                "Invalid watchdog timeout: {}ms (min {}ms)",
                d.as_millis(),
                crate::protocol::MIN_TIME.as_millis()
            ),
            Blink1Error::PatternLine { pos, source } => {
                write!(f, "Pattern line {pos} failed: {source}")
            }
            Blink1Error::Color(e) => write!(f, "Color error: {e}"),
            Blink1Error::State(e) => write!(f, "State error: {e}"),
            Blink1Error::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for Blink1Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Blink1Error::Device(e) => Some(e),
            Blink1Error::Io(e) => Some(e),
            Blink1Error::PatternLine { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DeviceError> for Blink1Error {
    fn from(e: DeviceError) -> Self {
        Blink1Error::Device(e)
    }
}

impl From<std::io::Error> for Blink1Error {
    fn from(e: std::io::Error) -> Self {
        Blink1Error::Io(e)
    }
}

impl Blink1Error {
    /// True when the error means the session is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Blink1Error::Device(DeviceError::Closed))
    }
}

/// Crate-level Result alias using [`Blink1Error`].
pub type Result<T> = std::result::Result<T, Blink1Error>;

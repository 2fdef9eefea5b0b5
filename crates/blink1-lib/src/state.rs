//! Light states, play states and patterns.
//!
//! Two layers mirror the two API levels: `DeviceLightState` /
//! `DevicePatternState` are what travels on the wire, `LightState` /
//! `PatternState` / `Pattern` are what callers build and inspect.
//!
//! A `LightState` has a canonical text form, `#RRGGBBL<led>T<ms>`, e.g.
//! `#FF0000L1T200` is red on LED 1 with a 200 ms fade. Sequences join
//! states with `;`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::duration_to_ms;
use crate::color::{self, Rgb};
use crate::error::{Blink1Error, Result};

// ── LED selector ──

/// Which LED a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedIndex {
    /// Both LEDs.
    #[default]
    All = 0,
    /// Top LED, next to the "blink(1)" label.
    First = 1,
    /// Bottom LED, next to the ThingM logo.
    Second = 2,
}

impl LedIndex {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(LedIndex::All),
            1 => Some(LedIndex::First),
            2 => Some(LedIndex::Second),
            _ => None,
        }
    }
}

impl fmt::Display for LedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedIndex::All => write!(f, "all LEDs"),
            LedIndex::First => write!(f, "LED 1"),
            LedIndex::Second => write!(f, "LED 2"),
        }
    }
}

// ── Wire-level states ──

/// A light state as stored in pattern RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceLightState {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub led: LedIndex,
    /// Fade time in milliseconds; the wire keeps 10 ms resolution.
    pub fade_msec: u32,
}

impl fmt::Display for DeviceLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X} led={} fade={}ms",
            self.r,
            self.g,
            self.b,
            self.led.to_byte(),
            self.fade_msec
        )
    }
}

/// Pattern play state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DevicePatternState {
    pub is_playing: bool,
    pub current_pos: u8,
    /// Loop start, inclusive.
    pub loop_start: u8,
    /// Loop end, exclusive.
    pub loop_end: u8,
    pub repeats_left: u8,
}

// ── High-level states ──

/// Pattern play state for the controller API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PatternState {
    pub is_playing: bool,
    pub current_position: u8,
    /// Loop start, inclusive.
    pub start_position: u8,
    /// Loop end, exclusive.
    pub end_position: u8,
    /// Repeats remaining; 0 while looping forever.
    pub repeat_times: u8,
}

impl From<DevicePatternState> for PatternState {
    fn from(st: DevicePatternState) -> Self {
        PatternState {
            is_playing: st.is_playing,
            current_position: st.current_pos,
            start_position: st.loop_start,
            end_position: st.loop_end,
            repeat_times: st.repeats_left,
        }
    }
}

impl fmt::Display for PatternState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} loop=[{},{}) left={}",
            if self.is_playing { "playing" } else { "stopped" },
            self.current_position,
            self.start_position,
            self.end_position,
            self.repeat_times
        )
    }
}

/// A color, the LED it applies to, and the fade time to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightState {
    pub color: Rgb,
    pub led: LedIndex,
    pub fade_time: Duration,
}

impl LightState {
    pub fn new(color: Rgb, fade_time: Duration, led: LedIndex) -> Self {
        LightState {
            color,
            led,
            fade_time,
        }
    }

    pub fn rgb(r: u8, g: u8, b: u8, fade_time: Duration, led: LedIndex) -> Self {
        Self::new(Rgb::new(r, g, b), fade_time, led)
    }

    /// Build from HSB; see [`color::hsb_to_rgb`] for ranges.
    pub fn hsb(hue: f64, saturation: f64, brightness: f64, fade_time: Duration, led: LedIndex) -> Self {
        Self::new(color::hsb_to_rgb(hue, saturation, brightness), fade_time, led)
    }

    /// Build from a preset color name.
    pub fn named(name: &str, fade_time: Duration, led: LedIndex) -> Result<Self> {
        let rgb = color::color_by_name(name)
            .ok_or_else(|| Blink1Error::Color(format!("Unknown color name: {name}")))?;
        Ok(Self::new(rgb, fade_time, led))
    }
}

impl From<&LightState> for DeviceLightState {
    fn from(st: &LightState) -> Self {
        DeviceLightState {
            r: st.color.r,
            g: st.color.g,
            b: st.color.b,
            led: st.led,
            fade_msec: duration_to_ms(st.fade_time),
        }
    }
}

impl From<DeviceLightState> for LightState {
    fn from(st: DeviceLightState) -> Self {
        LightState {
            color: Rgb::new(st.r, st.g, st.b),
            led: st.led,
            fade_time: Duration::from_millis(u64::from(st.fade_msec)),
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}L{}T{}",
            self.color,
            self.led.to_byte(),
            self.fade_time.as_millis()
        )
    }
}

impl FromStr for LightState {
    type Err = Blink1Error;

    /// Parse `#RRGGBBL<led>T<ms>`, case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let bad = |why: &str| Blink1Error::State(format!("{s:?}: {why}"));

        let text = s.trim().to_ascii_uppercase();
        if text.is_empty() {
            return Err(bad("empty state"));
        }
        let rest = text
            .strip_prefix('#')
            .ok_or_else(|| bad("expected leading '#'"))?;
        if rest.len() < 6 || !rest.is_char_boundary(6) {
            return Err(bad("expected 6 hex digits"));
        }
        let (hex, rest) = rest.split_at(6);
        if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad("invalid hex color"));
        }
        let color = color::parse_color(hex).map_err(|_| bad("invalid hex color"))?;

        let rest = rest.strip_prefix('L').ok_or_else(|| bad("expected 'L'"))?;
        let (led, fade) = rest.split_once('T').ok_or_else(|| bad("expected 'T'"))?;
        let led = led
            .parse::<u8>()
            .ok()
            .and_then(LedIndex::from_byte)
            .ok_or_else(|| bad("LED must be 0, 1 or 2"))?;
        let fade = fade
            .parse::<u64>()
            .map_err(|_| bad("fade time must be whole milliseconds"))?;

        Ok(LightState::new(color, Duration::from_millis(fade), led))
    }
}

impl Serialize for LightState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LightState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Sequences and patterns ──

/// Separator between states in the sequence text form.
pub const SEQUENCE_SEPARATOR: char = ';';

/// An ordered list of light states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateSequence(pub Vec<LightState>);

impl StateSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn states(&self) -> &[LightState] {
        &self.0
    }

    /// Sum of all fade times.
    pub fn total_fade(&self) -> Duration {
        self.0.iter().map(|st| st.fade_time).sum()
    }
}

impl From<Vec<LightState>> for StateSequence {
    fn from(v: Vec<LightState>) -> Self {
        StateSequence(v)
    }
}

impl fmt::Display for StateSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, st) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEQUENCE_SEPARATOR}")?;
            }
            write!(f, "{st}")?;
        }
        Ok(())
    }
}

impl FromStr for StateSequence {
    type Err = Blink1Error;

    /// Parse `;`-joined states. Empty input is an empty sequence.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(StateSequence::default());
        }
        s.split(SEQUENCE_SEPARATOR)
            .map(str::parse)
            .collect::<Result<Vec<_>>>()
            .map(StateSequence)
    }
}

impl Serialize for StateSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A loop over pattern RAM, optionally preloaded with a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    /// Loop start, inclusive.
    #[serde(default)]
    pub start_position: u8,
    /// Loop end, inclusive; 0 means the last position.
    #[serde(default)]
    pub end_position: u8,
    /// How many times to play the loop; 0 loops forever.
    #[serde(default)]
    pub repeat_times: u32,
    /// States written to RAM from `start_position` before playing.
    #[serde(default)]
    pub sequence: StateSequence,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop=[{},{}] repeat=", self.start_position, self.end_position)?;
        if self.repeat_times == 0 {
            write!(f, "forever")?;
        } else {
            write!(f, "{}", self.repeat_times)?;
        }
        write!(f, " states={}", self.sequence.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── LedIndex ──

    #[test]
    fn led_bytes() {
        assert_eq!(LedIndex::All.to_byte(), 0);
        assert_eq!(LedIndex::First.to_byte(), 1);
        assert_eq!(LedIndex::Second.to_byte(), 2);
        assert_eq!(LedIndex::from_byte(2), Some(LedIndex::Second));
        assert_eq!(LedIndex::from_byte(3), None);
    }

    // ── LightState text form ──

    #[test]
    fn light_state_to_string() {
        let st = LightState::rgb(0xFF, 0, 0, Duration::from_millis(200), LedIndex::First);
        assert_eq!(st.to_string(), "#FF0000L1T200");
    }

    #[test]
    fn light_state_parse() {
        let st: LightState = "#00ff80L2T1500".parse().unwrap();
        assert_eq!(st.color, Rgb::new(0, 0xFF, 0x80));
        assert_eq!(st.led, LedIndex::Second);
        assert_eq!(st.fade_time, Duration::from_millis(1500));
    }

    #[test]
    fn light_state_parse_lowercase_markers() {
        let st: LightState = "#abcdefl0t0".parse().unwrap();
        assert_eq!(st.color, Rgb::new(0xAB, 0xCD, 0xEF));
        assert_eq!(st.led, LedIndex::All);
        assert_eq!(st.fade_time, Duration::ZERO);
    }

    #[test]
    fn light_state_parse_errors() {
        for bad in [
            "",
            "FF0000L1T200",
            "#FF00L1T200",
            "#FF0000T200",
            "#FF0000L1",
            "#FF0000L3T200",
            "#FF0000L1T-5",
            "#FF0000L1T2.5",
            "#ZZ0000L1T200",
        ] {
            let err = bad.parse::<LightState>().unwrap_err();
            assert!(matches!(err, Blink1Error::State(_)), "{bad}");
        }
    }

    #[test]
    fn light_state_named() {
        let st = LightState::named("Orange", Duration::from_millis(10), LedIndex::All).unwrap();
        assert_eq!(st.color, Rgb::new(0xFF, 0xA5, 0x00));
        assert!(LightState::named("nope", Duration::ZERO, LedIndex::All).is_err());
    }

    #[test]
    fn light_state_hsb() {
        let st = LightState::hsb(240.0, 100.0, 100.0, Duration::ZERO, LedIndex::First);
        assert_eq!(st.color, Rgb::new(0, 0, 0xFF));
    }

    #[test]
    fn device_conversion_keeps_fields() {
        let st = LightState::rgb(1, 2, 3, Duration::from_millis(1234), LedIndex::Second);
        let dev = DeviceLightState::from(&st);
        assert_eq!((dev.r, dev.g, dev.b), (1, 2, 3));
        assert_eq!(dev.led, LedIndex::Second);
        assert_eq!(dev.fade_msec, 1234);
        assert_eq!(LightState::from(dev), st);
    }

    // ── StateSequence ──

    #[test]
    fn sequence_round_trip_text() {
        let text = "#FF0000L1T200;#00FF00L2T300";
        let seq: StateSequence = text.parse().unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.to_string(), text);
        assert_eq!(seq.total_fade(), Duration::from_millis(500));
    }

    #[test]
    fn sequence_empty_text() {
        let seq: StateSequence = "".parse().unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.to_string(), "");
    }

    #[test]
    fn sequence_propagates_state_error() {
        assert!("#FF0000L1T200;bogus".parse::<StateSequence>().is_err());
    }

    // ── serde ──

    #[test]
    fn pattern_serializes_sequence_as_text() {
        let pattern = Pattern {
            start_position: 0,
            end_position: 3,
            repeat_times: 2,
            sequence: "#010203L0T100".parse().unwrap(),
        };
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["sequence"], "#010203L0T100");
        let back: Pattern = serde_json::from_value(json).unwrap();
        assert_eq!(back, pattern);
    }

    #[test]
    fn pattern_deserializes_with_defaults() {
        let p: Pattern = serde_json::from_str(r#"{"repeat_times": 3}"#).unwrap();
        assert_eq!(p.start_position, 0);
        assert_eq!(p.end_position, 0);
        assert!(p.sequence.is_empty());
    }

    // ── Display ──

    #[test]
    fn pattern_display() {
        let p = Pattern {
            repeat_times: 0,
            ..Default::default()
        };
        assert_eq!(p.to_string(), "loop=[0,0] repeat=forever states=0");
    }

    #[test]
    fn pattern_state_from_device() {
        let dev = DevicePatternState {
            is_playing: true,
            current_pos: 3,
            loop_start: 1,
            loop_end: 6,
            repeats_left: 2,
        };
        let st = PatternState::from(dev);
        assert_eq!(st.to_string(), "playing at 3 loop=[1,6) left=2");
    }
}

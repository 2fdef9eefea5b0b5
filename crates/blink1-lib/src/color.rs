//! Color values, parsing and formatting.
//!
//! Colors are plain 8-bit RGB triplets. Gamma correction is not applied
//! here; the controller does that right before a color goes on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Blink1Error, Result};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// The color as a tuple, for the byte-level APIs.
    pub fn tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Blink1Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_color(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_color(&s).map_err(serde::de::Error::custom)
    }
}

// ── Presets ──

/// Named colors, sorted by name.
static PRESETS: &[(&str, Rgb)] = &[
    ("apricot", Rgb::new(0xFB, 0xCE, 0xB1)),
    ("aqua", Rgb::new(0x00, 0xFF, 0xFF)),
    ("beige", Rgb::new(0xF5, 0xF5, 0xDC)),
    ("black", Rgb::new(0x00, 0x00, 0x00)),
    ("blue", Rgb::new(0x00, 0x00, 0xFF)),
    ("bronze", Rgb::new(0xCD, 0x7F, 0x32)),
    ("brown", Rgb::new(0xA5, 0x2A, 0x2A)),
    ("cyan", Rgb::new(0x00, 0xFF, 0xFF)),
    ("fuchsia", Rgb::new(0xFF, 0x00, 0xFF)),
    ("gold", Rgb::new(0xFF, 0xD7, 0x00)),
    ("gray", Rgb::new(0x80, 0x80, 0x80)),
    ("green", Rgb::new(0x00, 0xFF, 0x00)),
    ("grey", Rgb::new(0x80, 0x80, 0x80)),
    ("indigo", Rgb::new(0x4B, 0x00, 0x82)),
    ("lavender", Rgb::new(0xE6, 0xE6, 0xFA)),
    ("lime", Rgb::new(0x00, 0x80, 0x00)),
    ("magenta", Rgb::new(0xFF, 0x00, 0xFF)),
    ("maroon", Rgb::new(0x80, 0x00, 0x00)),
    ("mint", Rgb::new(0x16, 0x98, 0x2B)),
    ("navy", Rgb::new(0x00, 0x00, 0x80)),
    ("off", Rgb::new(0x00, 0x00, 0x00)),
    ("olive", Rgb::new(0x80, 0x80, 0x00)),
    ("orange", Rgb::new(0xFF, 0xA5, 0x00)),
    ("peach", Rgb::new(0xFF, 0xE5, 0xB4)),
    ("pink", Rgb::new(0xFF, 0xC0, 0xCB)),
    ("plum", Rgb::new(0x8E, 0x45, 0x85)),
    ("purple", Rgb::new(0x80, 0x00, 0x80)),
    ("red", Rgb::new(0xFF, 0x00, 0x00)),
    ("scarlet", Rgb::new(0xFF, 0x24, 0x00)),
    ("silver", Rgb::new(0xC0, 0xC0, 0xC0)),
    ("teal", Rgb::new(0x00, 0x80, 0x80)),
    ("violet", Rgb::new(0x80, 0x00, 0xFF)),
    ("white", Rgb::new(0xFF, 0xFF, 0xFF)),
    ("yellow", Rgb::new(0xFF, 0xFF, 0x00)),
];

/// All preset color names, sorted.
pub fn color_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Look up a preset color by name (case-insensitive, surrounding whitespace ignored).
pub fn color_by_name(name: &str) -> Option<Rgb> {
    let name = name.trim().to_lowercase();
    PRESETS
        .binary_search_by(|(n, _)| (*n).cmp(name.as_str()))
        .ok()
        .map(|i| PRESETS[i].1)
}

/// First preset name for a color, if any.
pub fn color_name(rgb: Rgb) -> Option<&'static str> {
    PRESETS.iter().find(|(_, c)| *c == rgb).map(|(n, _)| *n)
}

// ── Parsing / formatting ──

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#f00"`, `"f00"`
/// - Named: any preset from [`color_names`], e.g. `"red"`, `"Teal"`
pub fn parse_color(s: &str) -> Result<Rgb> {
    let s = s.trim();
    if let Some(rgb) = color_by_name(s) {
        return Ok(rgb);
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Blink1Error::Color(format!(
            "Invalid color: {s} (use #RRGGBB, #RGB or a color name)"
        )));
    }
    let channel = |i: usize, len: usize| {
        u8::from_str_radix(&hex[i..i + len], 16)
            .map_err(|_| Blink1Error::Color(format!("Invalid hex color: {s}")))
    };
    match hex.len() {
        6 => Ok(Rgb::new(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
        3 => Ok(Rgb::new(
            channel(0, 1)? * 0x11,
            channel(1, 1)? * 0x11,
            channel(2, 1)? * 0x11,
        )),
        _ => Err(Blink1Error::Color(format!(
            "Invalid color: {s} (use #RRGGBB, #RGB or a color name)"
        ))),
    }
}

/// Format a color as `#RRGGBB`.
pub fn format_color(rgb: Rgb) -> String {
    rgb.to_string()
}

/// Preset name for a color, or its `#RRGGBB` form.
pub fn name_or_hex(rgb: Rgb) -> String {
    color_name(rgb).map_or_else(|| format_color(rgb), str::to_string)
}

/// Convert HSB/HSV to RGB.
///
/// `hue` is in degrees and wraps modulo 360; `saturation` and `brightness`
/// are percentages clamped to `[0, 100]`.
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 100.0) / 100.0;
    let v = brightness.clamp(0.0, 100.0) / 100.0;

    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    // Components are in [0, 1], so rounding half away from zero stays in u8 range.
    let c = |n: f64| (n * 255.0).round() as u8;

    match i as u8 % 6 {
        0 => Rgb::new(c(v), c(t), c(p)),
        1 => Rgb::new(c(q), c(v), c(p)),
        2 => Rgb::new(c(p), c(v), c(t)),
        3 => Rgb::new(c(p), c(q), c(v)),
        4 => Rgb::new(c(t), c(p), c(v)),
        _ => Rgb::new(c(v), c(p), c(q)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_color ──

    #[test]
    fn parse_named_primary() {
        assert_eq!(parse_color("red").unwrap(), Rgb::new(0xFF, 0, 0));
        assert_eq!(parse_color("green").unwrap(), Rgb::new(0, 0xFF, 0));
        assert_eq!(parse_color("blue").unwrap(), Rgb::new(0, 0, 0xFF));
    }

    #[test]
    fn parse_named_case_insensitive() {
        assert_eq!(parse_color("RED").unwrap(), Rgb::new(0xFF, 0, 0));
        assert_eq!(parse_color("  Teal ").unwrap(), Rgb::new(0, 0x80, 0x80));
    }

    #[test]
    fn parse_off_and_black() {
        assert_eq!(parse_color("off").unwrap(), Rgb::OFF);
        assert_eq!(parse_color("black").unwrap(), Rgb::OFF);
    }

    #[test]
    fn parse_hex_forms() {
        assert_eq!(parse_color("#FF8000").unwrap(), Rgb::new(0xFF, 0x80, 0x00));
        assert_eq!(parse_color("ff8000").unwrap(), Rgb::new(0xFF, 0x80, 0x00));
        assert_eq!(parse_color("#abc").unwrap(), Rgb::new(0xAA, 0xBB, 0xCC));
        assert_eq!(parse_color("F00").unwrap(), Rgb::new(0xFF, 0, 0));
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_color("#FFFF").is_err());
        assert!(parse_color("#FF00000").is_err());
        assert!(parse_color("#GG0000").is_err());
        assert!(parse_color("").is_err());
        assert!(parse_color("notacolor").is_err());
    }

    #[test]
    fn parse_error_is_color_variant() {
        let err = parse_color("#12").unwrap_err();
        assert!(matches!(err, Blink1Error::Color(_)));
    }

    #[test]
    fn from_str_delegates() {
        let rgb: Rgb = "#102030".parse().unwrap();
        assert_eq!(rgb, Rgb::new(0x10, 0x20, 0x30));
    }

    // ── format / names ──

    #[test]
    fn format_uppercase_hex() {
        assert_eq!(format_color(Rgb::new(0xAB, 0x0C, 0xEF)), "#AB0CEF");
        assert_eq!(Rgb::OFF.to_string(), "#000000");
    }

    #[test]
    fn presets_are_sorted_for_lookup() {
        let names: Vec<_> = color_names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn every_preset_resolves() {
        for name in color_names() {
            assert!(color_by_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn reverse_lookup() {
        assert_eq!(color_name(Rgb::new(0xFF, 0, 0)), Some("red"));
        assert_eq!(color_name(Rgb::new(1, 2, 3)), None);
        assert_eq!(name_or_hex(Rgb::new(1, 2, 3)), "#010203");
        assert_eq!(name_or_hex(Rgb::new(0xFF, 0xFF, 0)), "yellow");
    }

    #[test]
    fn serde_as_hex_string() {
        let json = serde_json::to_string(&Rgb::new(0x12, 0x34, 0x56)).unwrap();
        assert_eq!(json, "\"#123456\"");
        let back: Rgb = serde_json::from_str("\"purple\"").unwrap();
        assert_eq!(back, Rgb::new(0x80, 0, 0x80));
    }

    // ── hsb_to_rgb ──

    #[test]
    fn hsb_primaries() {
        assert_eq!(hsb_to_rgb(0.0, 100.0, 100.0), Rgb::new(255, 0, 0));
        assert_eq!(hsb_to_rgb(120.0, 100.0, 100.0), Rgb::new(0, 255, 0));
        assert_eq!(hsb_to_rgb(240.0, 100.0, 100.0), Rgb::new(0, 0, 255));
    }

    #[test]
    fn hsb_hue_wraps() {
        assert_eq!(hsb_to_rgb(360.0, 100.0, 100.0), hsb_to_rgb(0.0, 100.0, 100.0));
        assert_eq!(hsb_to_rgb(-120.0, 100.0, 100.0), hsb_to_rgb(240.0, 100.0, 100.0));
    }

    #[test]
    fn hsb_clamps_saturation_and_brightness() {
        assert_eq!(hsb_to_rgb(0.0, 0.0, 150.0), Rgb::WHITE);
        assert_eq!(hsb_to_rgb(0.0, 100.0, -5.0), Rgb::OFF);
    }

    #[test]
    fn hsb_half_brightness_rounds() {
        // 0.5 * 255 = 127.5 rounds away from zero
        assert_eq!(hsb_to_rgb(0.0, 0.0, 50.0), Rgb::new(128, 128, 128));
    }
}

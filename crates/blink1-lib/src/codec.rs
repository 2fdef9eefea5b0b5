//! Byte codec: pure conversions between domain values and report bytes.
//!
//! Fade times travel as a big-endian pair of centiseconds, flags as a single
//! `0`/`1` byte, and every color written to the device is first run through
//! the gamma table below.

use std::time::Duration;

use crate::protocol::{MAX_FADE_MSEC, MIN_TIME};

// ── Fade time ──

/// Encode milliseconds as the device's big-endian centisecond pair.
///
/// Values above [`MAX_FADE_MSEC`] are clamped; sub-10 ms remainders are
/// truncated.
pub fn ms_to_wire_fade(ms: u32) -> (u8, u8) {
    let cs = ms.min(MAX_FADE_MSEC) / 10;
    ((cs >> 8) as u8, (cs & 0xFF) as u8)
}

/// Decode a big-endian centisecond pair into milliseconds.
pub fn wire_fade_to_ms(hi: u8, lo: u8) -> u32 {
    ((u32::from(hi) << 8) | u32::from(lo)) * 10
}

/// Whole milliseconds of `d`, saturating at `u32::MAX`.
pub fn duration_to_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

/// Encode a duration as a wire fade pair.
pub fn duration_to_wire_fade(d: Duration) -> (u8, u8) {
    ms_to_wire_fade(duration_to_ms(d))
}

/// The fade time the device will actually run for `d`: clamped to the
/// maximum fade and truncated to the 10 ms resolution.
pub fn actual_fade_duration(d: Duration) -> Duration {
    let max = Duration::from_millis(u64::from(MAX_FADE_MSEC));
    if d > max {
        return max;
    }
    let step = MIN_TIME.as_nanos();
    let truncated = d.as_nanos() / step * step;
    Duration::from_nanos(truncated as u64)
}

// ── Flags ──

pub fn bool_to_byte(b: bool) -> u8 {
    u8::from(b)
}

pub fn byte_to_bool(b: u8) -> bool {
    b != 0
}

// ── Gamma ──

/// WS2812 gamma table, `255 * (x / 255) ^ (1 / 0.45)`, rounded.
///
/// Source values: blink1-tool `blink1-lib.c`, originally rgb-123.com.
pub static GAMMA_E: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, //
    2, 2, 2, 3, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, //
    6, 6, 6, 7, 7, 7, 8, 8, 8, 9, 9, 9, 10, 10, 11, 11, //
    11, 12, 12, 13, 13, 13, 14, 14, 15, 15, 16, 16, 17, 17, 18, 18, //
    19, 19, 20, 21, 21, 22, 22, 23, 23, 24, 25, 25, 26, 27, 27, 28, //
    29, 29, 30, 31, 31, 32, 33, 34, 34, 35, 36, 37, 37, 38, 39, 40, //
    40, 41, 42, 43, 44, 45, 46, 46, 47, 48, 49, 50, 51, 52, 53, 54, //
    55, 56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, //
    71, 72, 73, 74, 76, 77, 78, 79, 80, 81, 83, 84, 85, 86, 88, 89, //
    90, 91, 93, 94, 95, 96, 98, 99, 100, 102, 103, 104, 106, 107, 109, 110, //
    111, 113, 114, 116, 117, 119, 120, 121, 123, 124, 126, 128, 129, 131, 132, 134, //
    135, 137, 138, 140, 142, 143, 145, 146, 148, 150, 151, 153, 155, 157, 158, 160, //
    162, 163, 165, 167, 169, 170, 172, 174, 176, 178, 179, 181, 183, 185, 187, 189, //
    191, 193, 194, 196, 198, 200, 202, 204, 206, 208, 210, 212, 214, 216, 218, 220, //
    222, 224, 227, 229, 231, 233, 235, 237, 239, 241, 244, 246, 248, 250, 252, 255, //
];

/// Apply gamma correction to one RGB triplet.
pub fn degamma(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    (
        GAMMA_E[r as usize],
        GAMMA_E[g as usize],
        GAMMA_E[b as usize],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Fade time ──

    #[test]
    fn fade_zero() {
        assert_eq!(ms_to_wire_fade(0), (0, 0));
        assert_eq!(wire_fade_to_ms(0, 0), 0);
    }

    #[test]
    fn fade_is_big_endian_centiseconds() {
        // 3000 ms = 300 cs = 0x012C
        assert_eq!(ms_to_wire_fade(3000), (0x01, 0x2C));
        assert_eq!(wire_fade_to_ms(0x01, 0x2C), 3000);
    }

    #[test]
    fn fade_truncates_below_10ms() {
        assert_eq!(ms_to_wire_fade(9), (0, 0));
        assert_eq!(ms_to_wire_fade(19), (0, 1));
        let (hi, lo) = ms_to_wire_fade(1234);
        assert_eq!(wire_fade_to_ms(hi, lo), 1230);
    }

    #[test]
    fn fade_round_trip_truncates_across_range() {
        for ms in (0..=MAX_FADE_MSEC).step_by(997) {
            let (hi, lo) = ms_to_wire_fade(ms);
            assert_eq!(wire_fade_to_ms(hi, lo), ms / 10 * 10, "ms={ms}");
        }
        let (hi, lo) = ms_to_wire_fade(MAX_FADE_MSEC);
        assert_eq!(wire_fade_to_ms(hi, lo), MAX_FADE_MSEC);
    }

    #[test]
    fn fade_above_max_is_clamped() {
        assert_eq!(ms_to_wire_fade(MAX_FADE_MSEC + 1), (0xFF, 0xFF));
        assert_eq!(ms_to_wire_fade(u32::MAX), (0xFF, 0xFF));
        assert_eq!(wire_fade_to_ms(0xFF, 0xFF), 655_350);
    }

    #[test]
    fn duration_to_ms_saturates() {
        assert_eq!(duration_to_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_to_ms(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[test]
    fn duration_wire_fade_matches_ms() {
        assert_eq!(
            duration_to_wire_fade(Duration::from_millis(2500)),
            ms_to_wire_fade(2500)
        );
    }

    #[test]
    fn actual_fade_truncates_to_10ms() {
        assert_eq!(
            actual_fade_duration(Duration::from_millis(1239)),
            Duration::from_millis(1230)
        );
        assert_eq!(
            actual_fade_duration(Duration::from_micros(9_999)),
            Duration::ZERO
        );
    }

    #[test]
    fn actual_fade_clamps_to_max() {
        assert_eq!(
            actual_fade_duration(Duration::from_secs(3600)),
            Duration::from_millis(655_350)
        );
    }

    // ── Flags ──

    #[test]
    fn bool_bytes() {
        assert_eq!(bool_to_byte(true), 1);
        assert_eq!(bool_to_byte(false), 0);
        assert!(byte_to_bool(1));
        assert!(byte_to_bool(0xFF));
        assert!(!byte_to_bool(0));
    }

    // ── Gamma ──

    #[test]
    fn gamma_boundaries() {
        assert_eq!(GAMMA_E[0], 0);
        assert_eq!(GAMMA_E[1], 0);
        assert_eq!(GAMMA_E[254], 252);
        assert_eq!(GAMMA_E[255], 255);
    }

    #[test]
    fn gamma_known_midpoints() {
        assert_eq!(GAMMA_E[22], 1);
        assert_eq!(GAMMA_E[128], 55);
        assert_eq!(GAMMA_E[200], 148);
    }

    #[test]
    fn gamma_is_monotonic() {
        for w in GAMMA_E.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn degamma_per_channel() {
        assert_eq!(degamma(0, 128, 255), (0, 55, 255));
        assert_eq!(degamma(1, 254, 0), (0, 252, 0));
    }

    #[test]
    fn degamma_twice_differs_from_once() {
        let once = degamma(200, 200, 200);
        let twice = degamma(once.0, once.1, once.2);
        assert_ne!(once, twice);
    }
}

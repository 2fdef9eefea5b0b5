//! Protocol constants and report builders for blink(1) mk1/mk2 devices.
//!
//! Every command is a 9-byte HID feature report:
//!
//! | byte | meaning                                  |
//! |------|------------------------------------------|
//! | 0    | report id, always [`REPORT_ID`]          |
//! | 1    | ASCII opcode                             |
//! | 2..8 | opcode-specific payload, zero if unused  |
//!
//! Payload layouts per opcode:
//!
//! | op  | command            | 2     | 3       | 4       | 5       | 6       | 7     |
//! |-----|--------------------|-------|---------|---------|---------|---------|-------|
//! | `c` | fade to RGB        | r     | g       | b       | fade hi | fade lo | led   |
//! | `n` | set RGB now        | r     | g       | b       |         |         | led   |
//! | `r` | read RGB           | r*    | g*      | b*      |         |         | led   |
//! | `p` | play loop          | play  | start   | end     | repeat  |         |       |
//! | `S` | read play state    | play* | start*  | end*    | left*   | pos*    |       |
//! | `l` | select LED (mk2+)  | led   |         |         |         |         |       |
//! | `P` | set pattern line   | r     | g       | b       | fade hi | fade lo | pos   |
//! | `R` | read pattern line  | r*    | g*      | b*      | fade hi*| fade lo*| pos/led* |
//! | `W` | save pattern       | 0xBE  | 0xEF    | 0xCA    | 0xFE    |         |       |
//! | `D` | server tickle      | on    | tmo hi  | tmo lo  | keep    | start   | end   |
//! | `v` | get version        |       | major*  | minor*  |         |         |       |
//! | `!` | test               |       |         |         |         |         |       |
//!
//! `*` marks fields filled in by the device on read-back.

use std::time::Duration;

use crate::codec::{bool_to_byte, byte_to_bool, ms_to_wire_fade, wire_fade_to_ms};
use crate::state::{DeviceLightState, DevicePatternState, LedIndex};

// ── USB identifiers ──

/// ThingM vendor ID.
pub const BLINK1_VID: u16 = 0x27B8;

/// blink(1) product ID (shared by mk1, mk2 and mk3).
pub const BLINK1_PID: u16 = 0x01ED;

// ── HID class requests ──

/// HID `SET_REPORT` class request.
pub const HID_SET_REPORT: u8 = 0x09;

/// HID `GET_REPORT` class request.
pub const HID_GET_REPORT: u8 = 0x01;

/// Report type for feature reports (high byte of `wValue`).
pub const HID_REPORT_TYPE_FEATURE: u8 = 0x03;

/// USB interface class for HID.
pub const USB_CLASS_HID: u8 = 0x03;

/// Timeout per USB control transfer in milliseconds.
pub const USB_TIMEOUT_MS: u64 = 1000;

// ── Report framing ──

/// Report id carried in byte 0 of every command.
pub const REPORT_ID: u8 = 0x01;

/// Size of a command report, including the report id.
pub const REPORT_SIZE: usize = 9;

/// One command or response report.
pub type Report = [u8; REPORT_SIZE];

// ── Opcodes ──

pub const CMD_FADE_TO_RGB: u8 = b'c';
pub const CMD_SET_RGB_NOW: u8 = b'n';
pub const CMD_READ_RGB: u8 = b'r';
pub const CMD_PLAY_LOOP: u8 = b'p';
pub const CMD_READ_PLAY_STATE: u8 = b'S';
pub const CMD_SET_LED: u8 = b'l';
pub const CMD_SET_PATTERN_LINE: u8 = b'P';
pub const CMD_READ_PATTERN_LINE: u8 = b'R';
pub const CMD_SAVE_PATTERN: u8 = b'W';
pub const CMD_SERVER_TICKLE: u8 = b'D';
pub const CMD_GET_VERSION: u8 = b'v';
pub const CMD_TEST: u8 = b'!';

/// Payload of the save-pattern command that authorizes the flash write.
pub const SAVE_PATTERN_MAGIC: [u8; 4] = [0xBE, 0xEF, 0xCA, 0xFE];

// ── Limits and timing ──

/// Pattern RAM lines on mk1 hardware.
pub const MAX_PATTERN_MK1: u8 = 12;

/// Pattern RAM lines on mk2 and later.
pub const MAX_PATTERN_MK2: u8 = 32;

/// Largest encodable fade time: 0xFFFF centiseconds (10 min 55.35 s).
pub const MAX_FADE_MSEC: u32 = 0xFFFF * 10;

/// Largest encodable repeat count for play-loop.
pub const MAX_REPEAT: u32 = 0xFF;

/// Shortest interval the firmware treats as non-zero.
pub const MIN_TIME: Duration = Duration::from_millis(10);

/// Spacing between consecutive pattern RAM operations.
pub const OPS_INTERVAL: Duration = Duration::from_millis(30);

/// Attempts for a pattern RAM operation before giving up.
pub const OPS_TRY_TIMES: u32 = 3;

/// Auto-tickle period.
pub const TICKLE_PERIOD: Duration = Duration::from_secs(2);

/// Settle delay between writing and reading back the test command.
pub const TEST_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Pattern RAM capacity for a hardware generation.
pub fn max_pattern(generation: u16) -> u8 {
    if generation >= 2 {
        MAX_PATTERN_MK2
    } else {
        MAX_PATTERN_MK1
    }
}

// ── End-position sentinels ──

/// Wire end position for play-loop: `0` becomes the last line (inclusive).
pub fn play_loop_end(end: u8, max: u8) -> u8 {
    if end == 0 { max - 1 } else { end }
}

/// Wire end position for server tickle.
///
/// The firmware treats this end as exclusive, unlike play-loop, so a
/// non-zero end is shifted up by one and `0` becomes `max`.
pub fn tickle_end(end: u8, max: u8) -> u8 {
    if end == 0 { max } else { end + 1 }
}

// ── Builders ──

fn new_report(cmd: u8) -> Report {
    let mut buf = [0u8; REPORT_SIZE];
    buf[0] = REPORT_ID;
    buf[1] = cmd;
    buf
}

/// `c`: fade `led` to an RGB color over `fade_msec`.
pub fn build_fade_to_rgb(r: u8, g: u8, b: u8, fade_msec: u32, led: LedIndex) -> Report {
    let mut buf = new_report(CMD_FADE_TO_RGB);
    buf[2] = r;
    buf[3] = g;
    buf[4] = b;
    (buf[5], buf[6]) = ms_to_wire_fade(fade_msec);
    buf[7] = led.to_byte();
    buf
}

/// `n`: set `led` to an RGB color immediately.
pub fn build_set_rgb_now(r: u8, g: u8, b: u8, led: LedIndex) -> Report {
    let mut buf = new_report(CMD_SET_RGB_NOW);
    buf[2] = r;
    buf[3] = g;
    buf[4] = b;
    buf[7] = led.to_byte();
    buf
}

/// `r`: request the current color of `led`.
pub fn build_read_rgb(led: LedIndex) -> Report {
    let mut buf = new_report(CMD_READ_RGB);
    buf[7] = led.to_byte();
    buf
}

/// `p`: start or stop a loop over `[start, end]`, `times == 0` loops forever.
pub fn build_play_loop(play: bool, start: u8, end: u8, times: u8) -> Report {
    let mut buf = new_report(CMD_PLAY_LOOP);
    buf[2] = bool_to_byte(play);
    buf[3] = start;
    buf[4] = end;
    buf[5] = times;
    buf
}

/// `S`: request the pattern play state.
pub fn build_read_play_state() -> Report {
    new_report(CMD_READ_PLAY_STATE)
}

/// `l`: select the LED that the next pattern-line write applies to.
pub fn build_set_led(led: LedIndex) -> Report {
    let mut buf = new_report(CMD_SET_LED);
    buf[2] = led.to_byte();
    buf
}

/// `P`: store a light state at pattern position `pos`.
///
/// The LED selector is not part of this report; mk2+ sends it separately
/// with [`build_set_led`].
pub fn build_set_pattern_line(state: &DeviceLightState, pos: u8) -> Report {
    let mut buf = new_report(CMD_SET_PATTERN_LINE);
    buf[2] = state.r;
    buf[3] = state.g;
    buf[4] = state.b;
    (buf[5], buf[6]) = ms_to_wire_fade(state.fade_msec);
    buf[7] = pos;
    buf
}

/// `R`: request the light state stored at `pos`.
pub fn build_read_pattern_line(pos: u8) -> Report {
    let mut buf = new_report(CMD_READ_PATTERN_LINE);
    buf[7] = pos;
    buf
}

/// `W`: commit pattern RAM to flash.
pub fn build_save_pattern() -> Report {
    let mut buf = new_report(CMD_SAVE_PATTERN);
    buf[2..6].copy_from_slice(&SAVE_PATTERN_MAGIC);
    buf
}

/// `D`: arm or disarm the server tickle watchdog.
///
/// `end` is written as given; callers resolve it with [`tickle_end`].
pub fn build_server_tickle(play: bool, keep: bool, start: u8, end: u8, timeout_msec: u32) -> Report {
    let mut buf = new_report(CMD_SERVER_TICKLE);
    buf[2] = bool_to_byte(play);
    (buf[3], buf[4]) = ms_to_wire_fade(timeout_msec);
    buf[5] = bool_to_byte(keep);
    buf[6] = start;
    buf[7] = end;
    buf
}

/// `v`: request the firmware version.
pub fn build_get_version() -> Report {
    new_report(CMD_GET_VERSION)
}

/// `!`: diagnostic echo.
pub fn build_test() -> Report {
    new_report(CMD_TEST)
}

// ── Response parsers ──

/// RGB from a read-RGB response.
pub fn parse_rgb(buf: &Report) -> (u8, u8, u8) {
    (buf[2], buf[3], buf[4])
}

/// Play state from a read-play-state response.
pub fn parse_play_state(buf: &Report) -> DevicePatternState {
    DevicePatternState {
        is_playing: byte_to_bool(buf[2]),
        loop_start: buf[3],
        loop_end: buf[4],
        repeats_left: buf[5],
        current_pos: buf[6],
    }
}

/// Light state from a read-pattern-line response.
pub fn parse_pattern_line(buf: &Report) -> DeviceLightState {
    DeviceLightState {
        r: buf[2],
        g: buf[3],
        b: buf[4],
        led: LedIndex::from_byte(buf[7]).unwrap_or_default(),
        fade_msec: wire_fade_to_ms(buf[5], buf[6]),
    }
}

/// Firmware version from a get-version response: ASCII digits at bytes 3
/// and 4, combined as `major * 100 + minor`.
///
/// Returns `None` if either byte is not an ASCII digit.
pub fn parse_version(buf: &Report) -> Option<u16> {
    let digit = |b: u8| b.is_ascii_digit().then(|| u16::from(b - b'0'));
    Some(digit(buf[3])? * 100 + digit(buf[4])?)
}

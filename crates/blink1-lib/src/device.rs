//! Device communication: transport session + HID backends.
//!
//! [`Blink1Device`] owns one open HID handle behind a single mutex. Every
//! command, including the two-report pattern-line write on mk2+, runs with
//! that lock held, so reports never interleave on the wire.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::protocol::{self, REPORT_SIZE, Report, TEST_SETTLE_DELAY};
use crate::state::{DeviceLightState, DevicePatternState, LedIndex};

// ── Error type ──

/// Device communication errors.
///
/// String payloads follow the convention **"context: details"** where *context*
/// names the command (e.g. `"fade_to_rgb"`, `"USB open"`) and *details*
/// describes what went wrong.
#[derive(Debug)]
pub enum DeviceError {
    NotFound,
    OpenFailed(String),
    /// The session was closed; no further I/O is possible.
    Closed,
    WriteFailed(String),
    ReadFailed(String),
    InvalidPosition { pos: u8, max: u8 },
    BadResponse(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "blink(1) device not found"),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            DeviceError::Closed => write!(f, "Device is closed"),
            DeviceError::WriteFailed(e) => write!(f, "Write failed: {e}"),
            DeviceError::ReadFailed(e) => write!(f, "Read failed: {e}"),
            DeviceError::InvalidPosition { pos, max } => {
                write!(f, "Pattern position {pos} is out of range [0, {max})")
            }
            DeviceError::BadResponse(e) => write!(f, "Unexpected response: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Device info ──

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Bus location, e.g. `usb:001/004`.
    pub path: String,
    /// USB product string, e.g. "blink(1) mk2".
    pub product: String,
    /// Hardware generation from the device release number: 1 = mk1, 2 = mk2, 3 = mk3.
    pub generation: u16,
    pub serial: Option<String>,
}

impl DeviceInfo {
    /// Number of pattern RAM lines this device holds.
    pub fn max_pattern(&self) -> u8 {
        protocol::max_pattern(self.generation)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (gen {}, serial {})",
            self.product,
            self.generation,
            self.serial.as_deref().unwrap_or("none")
        )
    }
}

// ── Trait ──

/// Raw HID feature-report access, one implementation per backend.
///
/// Errors are plain strings; [`Blink1Device`] wraps them with the name of
/// the command that failed.
pub trait HidHandle: Send {
    fn write_feature_report(&self, data: &[u8]) -> std::result::Result<(), String>;
    /// Fill `buf` with the current feature report; returns the byte count.
    fn read_feature_report(&self, buf: &mut [u8]) -> std::result::Result<usize, String>;
}

// ── Transport session ──

/// An open blink(1) and the commands it understands.
///
/// Colors passed here go to the wire unchanged; gamma correction belongs to
/// [`crate::controller::Controller`].
pub struct Blink1Device<H: HidHandle> {
    info: DeviceInfo,
    handle: Mutex<Option<H>>,
}

impl<H: HidHandle> Blink1Device<H> {
    pub fn new(handle: H, info: DeviceInfo) -> Self {
        Blink1Device {
            info,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn generation(&self) -> u16 {
        self.info.generation
    }

    pub fn max_pattern(&self) -> u8 {
        self.info.max_pattern()
    }

    /// Release the HID handle. Safe to call more than once.
    pub fn close(&self) {
        if self.lock().take().is_some() {
            log::info!("closed {}", self.info.path);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<H>> {
        // A panic mid-report leaves nothing half-updated on our side.
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_handle<T>(&self, f: impl FnOnce(&H) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        let handle = guard.as_ref().ok_or(DeviceError::Closed)?;
        f(handle)
    }

    // ── I/O primitives ──

    fn write(&self, op: &str, buf: &Report) -> Result<()> {
        self.with_handle(|h| send(h, op, buf))
    }

    /// Two reports under one lock acquisition.
    fn double_write(&self, op: &str, first: &Report, second: &Report) -> Result<()> {
        self.with_handle(|h| {
            send(h, op, first)?;
            send(h, op, second)
        })
    }

    fn read(&self, op: &str, buf: &mut Report) -> Result<()> {
        self.delay_read(op, buf, Duration::ZERO)
    }

    /// Write `buf`, wait `delay`, then read the response back into `buf`.
    fn delay_read(&self, op: &str, buf: &mut Report, delay: Duration) -> Result<()> {
        self.with_handle(|h| {
            send(h, op, buf)?;
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            let n = h
                .read_feature_report(buf)
                .map_err(|e| DeviceError::ReadFailed(format!("{op}: {e}")))?;
            if n == 0 {
                return Err(DeviceError::ReadFailed(format!("{op}: empty report")));
            }
            log::debug!("{op}: read  {}", hex(buf));
            Ok(())
        })
    }

    fn check_pattern_pos(&self, pos: u8) -> Result<()> {
        let max = self.max_pattern();
        if pos >= max {
            return Err(DeviceError::InvalidPosition { pos, max });
        }
        Ok(())
    }

    // ── Commands ──

    /// Fade `led` to an RGB color over `fade_msec` milliseconds.
    pub fn fade_to_rgb(&self, r: u8, g: u8, b: u8, fade_msec: u32, led: LedIndex) -> Result<()> {
        self.write(
            "fade_to_rgb",
            &protocol::build_fade_to_rgb(r, g, b, fade_msec, led),
        )
    }

    /// Set `led` to an RGB color immediately.
    ///
    /// On mk2+ firmware a non-zero `led` turns every LED white regardless
    /// of the color given. Use [`fade_to_rgb`](Self::fade_to_rgb) with a
    /// zero fade to address a single LED.
    pub fn set_rgb_now(&self, r: u8, g: u8, b: u8, led: LedIndex) -> Result<()> {
        self.write("set_rgb_now", &protocol::build_set_rgb_now(r, g, b, led))
    }

    /// Current color of `led`. On mk2+ `LedIndex::All` reads LED 1.
    pub fn read_rgb(&self, led: LedIndex) -> Result<(u8, u8, u8)> {
        let mut buf = protocol::build_read_rgb(led);
        self.read("read_rgb", &mut buf)?;
        Ok(protocol::parse_rgb(&buf))
    }

    /// Start or stop a loop over `[start, end]`; `end == 0` means the last
    /// line and `times == 0` loops forever.
    ///
    /// `start > end` is accepted; the firmware wraps around pattern RAM.
    pub fn play_loop(&self, play: bool, start: u8, end: u8, times: u8) -> Result<()> {
        self.check_pattern_pos(start)?;
        self.check_pattern_pos(end)?;
        let end = protocol::play_loop_end(end, self.max_pattern());
        self.write(
            "play_loop",
            &protocol::build_play_loop(play, start, end, times),
        )
    }

    pub fn read_play_state(&self) -> Result<DevicePatternState> {
        let mut buf = protocol::build_read_play_state();
        self.read("read_play_state", &mut buf)?;
        Ok(protocol::parse_play_state(&buf))
    }

    /// Store `state` at pattern position `pos`.
    ///
    /// mk2+ needs the LED selected first; both reports go out under one lock.
    pub fn set_pattern_line(&self, pos: u8, state: &DeviceLightState) -> Result<()> {
        self.check_pattern_pos(pos)?;
        let line = protocol::build_set_pattern_line(state, pos);
        if self.generation() >= 2 {
            let select = protocol::build_set_led(state.led);
            self.double_write("set_pattern_line", &select, &line)
        } else {
            self.write("set_pattern_line", &line)
        }
    }

    pub fn read_pattern_line(&self, pos: u8) -> Result<DeviceLightState> {
        self.check_pattern_pos(pos)?;
        let mut buf = protocol::build_read_pattern_line(pos);
        self.read("read_pattern_line", &mut buf)?;
        Ok(protocol::parse_pattern_line(&buf))
    }

    /// Commit pattern RAM to flash.
    ///
    /// Flash programming stalls USB long enough that the write always reports
    /// an error even though the save succeeds. That transport error is logged
    /// and dropped here, and only here. A closed session still fails.
    pub fn save_pattern(&self) -> Result<()> {
        match self.write("save_pattern", &protocol::build_save_pattern()) {
            Err(DeviceError::Closed) => Err(DeviceError::Closed),
            Err(e) => {
                log::debug!("save_pattern: ignoring expected transport error: {e}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Arm (`play`) or disarm the server tickle watchdog.
    ///
    /// When armed and not re-armed within `timeout_msec`, the device plays
    /// `[start, end]` on its own. `keep` leaves the current pattern running.
    pub fn set_tickle_mode(
        &self,
        play: bool,
        keep: bool,
        start: u8,
        end: u8,
        timeout_msec: u32,
    ) -> Result<()> {
        self.check_pattern_pos(start)?;
        self.check_pattern_pos(end)?;
        let end = protocol::tickle_end(end, self.max_pattern());
        self.write(
            "set_tickle_mode",
            &protocol::build_server_tickle(play, keep, start, end, timeout_msec),
        )
    }

    /// Firmware version as `major * 100 + minor`.
    pub fn get_version(&self) -> Result<u16> {
        let mut buf = protocol::build_get_version();
        self.read("get_version", &mut buf)?;
        protocol::parse_version(&buf).ok_or_else(|| {
            DeviceError::BadResponse(format!(
                "get_version: non-digit version bytes {:02X} {:02X}",
                buf[3], buf[4]
            ))
        })
    }

    /// Diagnostic echo; returns the raw response.
    pub fn test(&self) -> Result<Report> {
        let mut buf = protocol::build_test();
        self.delay_read("test", &mut buf, TEST_SETTLE_DELAY)?;
        Ok(buf)
    }
}

fn send<H: HidHandle>(h: &H, op: &str, buf: &Report) -> Result<()> {
    log::debug!("{op}: write {}", hex(buf));
    h.write_feature_report(buf)
        .map_err(|e| DeviceError::WriteFailed(format!("{op}: {e}")))
}

fn hex(buf: &[u8]) -> String {
    buf.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;

    use nusb::transfer::{Control, ControlType, Recipient};

    use crate::protocol::{
        BLINK1_PID, BLINK1_VID, HID_GET_REPORT, HID_REPORT_TYPE_FEATURE, HID_SET_REPORT,
        USB_CLASS_HID, USB_TIMEOUT_MS,
    };

    /// HID feature reports over USB control transfers.
    pub struct LinuxHidHandle {
        interface: nusb::Interface,
        interface_number: u16,
    }

    impl LinuxHidHandle {
        fn control(&self, request: u8, report_id: u8) -> Control {
            Control {
                control_type: ControlType::Class,
                recipient: Recipient::Interface,
                request,
                value: (u16::from(HID_REPORT_TYPE_FEATURE) << 8) | u16::from(report_id),
                index: self.interface_number,
            }
        }
    }

    impl HidHandle for LinuxHidHandle {
        fn write_feature_report(&self, data: &[u8]) -> std::result::Result<(), String> {
            let report_id = data.first().copied().unwrap_or(0);
            self.interface
                .control_out_blocking(
                    self.control(HID_SET_REPORT, report_id),
                    data,
                    Duration::from_millis(USB_TIMEOUT_MS),
                )
                .map_err(|e| format!("SET_REPORT: {e}"))?;
            Ok(())
        }

        fn read_feature_report(&self, buf: &mut [u8]) -> std::result::Result<usize, String> {
            let report_id = buf.first().copied().unwrap_or(0);
            self.interface
                .control_in_blocking(
                    self.control(HID_GET_REPORT, report_id),
                    buf,
                    Duration::from_millis(USB_TIMEOUT_MS),
                )
                .map_err(|e| format!("GET_REPORT: {e}"))
        }
    }

    fn is_blink1(dev: &nusb::DeviceInfo) -> bool {
        dev.vendor_id() == BLINK1_VID && dev.product_id() == BLINK1_PID
    }

    fn bus_path(dev: &nusb::DeviceInfo) -> String {
        format!("usb:{:03}/{:03}", dev.bus_number(), dev.device_address())
    }

    pub fn enumerate() -> Vec<DiscoveredDevice> {
        let Ok(devices) = nusb::list_devices() else {
            return Vec::new();
        };

        devices
            .filter(is_blink1)
            .map(|dev| DiscoveredDevice {
                path: bus_path(&dev),
                serial: dev.serial_number().map(|s| s.to_string()),
                product: dev.product_string().unwrap_or_default().to_string(),
                generation: dev.device_version(),
            })
            .collect()
    }

    /// Open the first blink(1), or the one whose serial matches.
    pub fn open(serial: Option<&str>) -> Result<(LinuxHidHandle, DeviceInfo)> {
        let device_info = nusb::list_devices()
            .map_err(|e| DeviceError::OpenFailed(format!("USB enumeration: {e}")))?
            .filter(is_blink1)
            .find(|dev| match serial {
                Some(want) => dev
                    .serial_number()
                    .is_some_and(|s| s.eq_ignore_ascii_case(want)),
                None => true,
            })
            .ok_or(DeviceError::NotFound)?;

        let iface_num = device_info
            .interfaces()
            .find(|iface| iface.class() == USB_CLASS_HID)
            .map(|iface| iface.interface_number())
            .ok_or_else(|| DeviceError::OpenFailed("no HID interface".into()))?;

        let usb_device = device_info.open().map_err(|e| {
            DeviceError::OpenFailed(format!(
                "USB open: {e} (check udev permissions for {BLINK1_VID:04x}:{BLINK1_PID:04x})"
            ))
        })?;

        // usbhid binds the interface; take it over for raw control transfers.
        let interface = usb_device
            .detach_and_claim_interface(iface_num)
            .map_err(|e| DeviceError::OpenFailed(format!("claim interface {iface_num}: {e}")))?;

        let info = DeviceInfo {
            path: bus_path(&device_info),
            product: device_info.product_string().unwrap_or_default().to_string(),
            generation: device_info.device_version(),
            serial: device_info.serial_number().map(|s| s.to_string()),
        };
        log::info!("opened {info} at {}", info.path);

        Ok((
            LinuxHidHandle {
                interface,
                interface_number: u16::from(iface_num),
            },
            info,
        ))
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::LinuxHidHandle;

// ── Stub handle for unsupported platforms ──

/// Placeholder handle; opening always fails with `NotFound`.
/// Enables compilation and `cargo test` on unsupported hosts.
#[cfg(not(target_os = "linux"))]
pub struct StubHandle;

#[cfg(not(target_os = "linux"))]
impl HidHandle for StubHandle {
    fn write_feature_report(&self, _data: &[u8]) -> std::result::Result<(), String> {
        Err("HID access is not supported on this platform".into())
    }
    fn read_feature_report(&self, _buf: &mut [u8]) -> std::result::Result<usize, String> {
        Err("HID access is not supported on this platform".into())
    }
}

// ── Device enumeration ──

/// A connected blink(1), not yet opened.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub path: String,
    pub serial: Option<String>,
    pub product: String,
    pub generation: u16,
}

/// List all connected blink(1) devices.
///
/// On unsupported platforms, always returns an empty list.
pub fn enumerate_devices() -> Vec<DiscoveredDevice> {
    #[cfg(target_os = "linux")]
    {
        linux_impl::enumerate()
    }
    #[cfg(not(target_os = "linux"))]
    {
        Vec::new()
    }
}

/// Concrete handle type for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformHandle = LinuxHidHandle;
#[cfg(not(target_os = "linux"))]
pub type PlatformHandle = StubHandle;

/// Open the first connected blink(1).
pub fn open_device() -> Result<Blink1Device<PlatformHandle>> {
    open_platform(None)
}

/// Open the blink(1) with a matching serial number (case-insensitive).
///
/// If `serial` is empty, delegates to [`open_device`].
pub fn open_device_by_serial(serial: &str) -> Result<Blink1Device<PlatformHandle>> {
    let serial = serial.trim();
    if serial.is_empty() {
        return open_device();
    }
    match open_platform(Some(serial)) {
        Err(DeviceError::NotFound) => {
            let devices = enumerate_devices();
            if devices.is_empty() {
                return Err(DeviceError::NotFound);
            }
            let available: Vec<&str> = devices
                .iter()
                .map(|d| d.serial.as_deref().unwrap_or("(no serial)"))
                .collect();
            Err(DeviceError::OpenFailed(format!(
                "no device with serial '{serial}' found (available: {})",
                available.join(", ")
            )))
        }
        other => other,
    }
}

#[cfg(target_os = "linux")]
fn open_platform(serial: Option<&str>) -> Result<Blink1Device<PlatformHandle>> {
    let (handle, info) = linux_impl::open(serial)?;
    Ok(Blink1Device::new(handle, info))
}

#[cfg(not(target_os = "linux"))]
fn open_platform(_serial: Option<&str>) -> Result<Blink1Device<PlatformHandle>> {
    Err(DeviceError::NotFound)
}

// ── Mock device for testing ──

/// In-memory blink(1) for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::time::Instant;

    use crate::protocol::{
        CMD_FADE_TO_RGB, CMD_GET_VERSION, CMD_PLAY_LOOP, CMD_READ_PATTERN_LINE,
        CMD_READ_PLAY_STATE, CMD_READ_RGB, CMD_SET_LED, CMD_SET_PATTERN_LINE, CMD_SET_RGB_NOW,
    };

    /// One stored pattern line: r, g, b, fade hi, fade lo, led.
    type Line = [u8; 6];

    #[derive(Default)]
    struct MockState {
        writes: Vec<(Instant, Vec<u8>)>,
        last_write: Option<Vec<u8>>,
        reads: usize,
        queued: HashMap<u8, VecDeque<Vec<u8>>>,
        fail_writes: u32,
        fail_reads: u32,
        fail_ops: HashMap<u8, u32>,
        color: [u8; 3],
        pending_led: u8,
        lines: HashMap<u8, Line>,
        play: [u8; 4],
        version: [u8; 2],
    }

    /// Emulates the firmware's report handling closely enough for tests:
    /// pattern lines written with `P` read back with `R`, colors with `r`,
    /// the last `p` with `S`. Anything else echoes the last write.
    ///
    /// Clones share state, so a test can keep one clone for inspection
    /// while the device owns the other.
    #[derive(Clone, Default)]
    pub struct MockHandle {
        state: Arc<Mutex<MockState>>,
    }

    impl MockHandle {
        pub fn new() -> Self {
            let handle = MockHandle::default();
            handle.set_version(b'2', b'0');
            handle
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Every attempted write, in order, including failed ones.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.lock().writes.iter().map(|(_, w)| w.clone()).collect()
        }

        pub fn write_times(&self) -> Vec<Instant> {
            self.lock().writes.iter().map(|(t, _)| *t).collect()
        }

        pub fn writes_with_opcode(&self, op: u8) -> Vec<Vec<u8>> {
            self.writes()
                .into_iter()
                .filter(|w| w.get(1) == Some(&op))
                .collect()
        }

        pub fn read_count(&self) -> usize {
            self.lock().reads
        }

        pub fn clear_writes(&self) {
            self.lock().writes.clear();
        }

        /// Queue a raw response for the next read following a write of `op`.
        pub fn queue_response(&self, op: u8, response: Vec<u8>) {
            self.lock().queued.entry(op).or_default().push_back(response);
        }

        /// Fail the next `n` writes, whatever their opcode.
        pub fn fail_next_writes(&self, n: u32) {
            self.lock().fail_writes = n;
        }

        pub fn fail_next_reads(&self, n: u32) {
            self.lock().fail_reads = n;
        }

        /// Fail the next `n` writes of `op`; `u32::MAX` fails them all.
        pub fn fail_opcode(&self, op: u8, n: u32) {
            self.lock().fail_ops.insert(op, n);
        }

        /// ASCII version digits returned by `v`.
        pub fn set_version(&self, major: u8, minor: u8) {
            self.lock().version = [major, minor];
        }

        /// Pattern line as stored: r, g, b, fade hi, fade lo, led.
        pub fn line(&self, pos: u8) -> Option<[u8; 6]> {
            self.lock().lines.get(&pos).copied()
        }

        pub fn color(&self) -> (u8, u8, u8) {
            let c = self.lock().color;
            (c[0], c[1], c[2])
        }
    }

    impl HidHandle for MockHandle {
        fn write_feature_report(&self, data: &[u8]) -> std::result::Result<(), String> {
            let mut st = self.lock();
            st.writes.push((Instant::now(), data.to_vec()));

            let op = data.get(1).copied().unwrap_or(0);
            if st.fail_writes > 0 {
                st.fail_writes -= 1;
                return Err("mock: write failure injected".into());
            }
            if let Some(n) = st.fail_ops.get_mut(&op)
                && *n > 0
            {
                if *n != u32::MAX {
                    *n -= 1;
                }
                return Err(format!("mock: write failure injected for '{}'", op as char));
            }

            let mut buf = [0u8; REPORT_SIZE];
            let len = data.len().min(REPORT_SIZE);
            buf[..len].copy_from_slice(&data[..len]);
            match op {
                CMD_FADE_TO_RGB | CMD_SET_RGB_NOW => st.color = [buf[2], buf[3], buf[4]],
                CMD_SET_LED => st.pending_led = buf[2],
                CMD_SET_PATTERN_LINE => {
                    let led = st.pending_led;
                    st.lines
                        .insert(buf[7], [buf[2], buf[3], buf[4], buf[5], buf[6], led]);
                }
                CMD_PLAY_LOOP => st.play = [buf[2], buf[3], buf[4], buf[5]],
                _ => {}
            }
            st.last_write = Some(data.to_vec());
            Ok(())
        }

        fn read_feature_report(&self, buf: &mut [u8]) -> std::result::Result<usize, String> {
            let mut st = self.lock();
            st.reads += 1;
            if st.fail_reads > 0 {
                st.fail_reads -= 1;
                return Err("mock: read failure injected".into());
            }

            let last = st.last_write.clone().unwrap_or_default();
            let op = last.get(1).copied().unwrap_or(0);
            let mut resp = vec![0u8; REPORT_SIZE];
            resp[..last.len().min(REPORT_SIZE)]
                .copy_from_slice(&last[..last.len().min(REPORT_SIZE)]);

            if let Some(queued) = st.queued.get_mut(&op).and_then(VecDeque::pop_front) {
                resp = queued;
            } else {
                match op {
                    CMD_READ_RGB => resp[2..5].copy_from_slice(&st.color),
                    CMD_READ_PATTERN_LINE => {
                        let pos = resp[7];
                        let line = st.lines.get(&pos).copied().unwrap_or_default();
                        resp[2..7].copy_from_slice(&line[..5]);
                        resp[7] = line[5];
                    }
                    CMD_READ_PLAY_STATE => {
                        resp[2..6].copy_from_slice(&st.play);
                        resp[6] = st.play[1];
                    }
                    CMD_GET_VERSION => resp[3..5].copy_from_slice(&st.version),
                    _ => {}
                }
            }

            let n = resp.len().min(buf.len());
            buf[..n].copy_from_slice(&resp[..n]);
            Ok(n)
        }
    }

    pub fn mock_info(generation: u16) -> DeviceInfo {
        DeviceInfo {
            path: "mock://blink1".into(),
            product: if generation >= 2 {
                "blink(1) mk2".into()
            } else {
                "blink(1)".into()
            },
            generation,
            serial: Some("MOCK1234".into()),
        }
    }

    /// A device over a fresh mock, plus a clone of the mock for inspection.
    pub fn device(generation: u16) -> (Blink1Device<MockHandle>, MockHandle) {
        let handle = MockHandle::new();
        let dev = Blink1Device::new(handle.clone(), mock_info(generation));
        (dev, handle)
    }
}

//! High-level blink(1) control: colors, patterns, playback and watchdog.
//!
//! [`Controller`] sits on top of a [`Blink1Device`] and adds what the raw
//! commands leave to the caller: gamma correction on every color written,
//! position validation before any I/O, paced and retried pattern loads, and
//! ownership of the auto-tickle watchdog thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::codec::{actual_fade_duration, degamma, duration_to_ms};
use crate::color::{self, Rgb};
use crate::config::Config;
use crate::device::{self, Blink1Device, DeviceError, DeviceInfo, HidHandle, PlatformHandle};
use crate::error::{Blink1Error, Result};
use crate::protocol::{self, MAX_REPEAT, MIN_TIME, OPS_INTERVAL, TICKLE_PERIOD};
use crate::retry::RetryPolicy;
use crate::state::{DeviceLightState, LedIndex, LightState, Pattern, PatternState, StateSequence};
use crate::tickle::{AutoTickle, ManualTickle, TickleParams};

/// Tunables for a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Gamma-correct colors before writing them.
    pub gamma: bool,
    /// Auto-tickle re-arm period; the device timeout is 150% of this.
    pub tickle_period: Duration,
    /// Retry policy for pattern line reads and writes.
    pub retry: RetryPolicy,
    /// Pause between consecutive pattern line writes.
    pub ops_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            gamma: true,
            tickle_period: TICKLE_PERIOD,
            retry: RetryPolicy::default(),
            ops_interval: OPS_INTERVAL,
        }
    }
}

/// True if `[start, end]` fits a pattern RAM of `capacity` lines.
/// `end == 0` stands for the last line.
pub fn is_pos_range_valid(start: u8, end: u8, capacity: u8) -> bool {
    (start <= end && end < capacity) || (start < capacity && end == 0)
}

// ── Shutdown signal ──

/// Set once by `close`; wakes threads parked in blocking playback.
#[derive(Default)]
struct ShutdownSignal {
    closed: Mutex<bool>,
    cvar: Condvar,
}

impl ShutdownSignal {
    fn trigger(&self) {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.cvar.notify_all();
    }

    /// Wait until triggered or `timeout` elapses (`None` waits forever).
    /// Returns `true` if triggered.
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        match timeout {
            None => {
                let guard = self
                    .cvar
                    .wait_while(guard, |closed| !*closed)
                    .unwrap_or_else(|e| e.into_inner());
                *guard
            }
            Some(timeout) => {
                let (guard, _) = self
                    .cvar
                    .wait_timeout_while(guard, timeout, |closed| !*closed)
                    .unwrap_or_else(|e| e.into_inner());
                *guard
            }
        }
    }
}

// ── Controller ──

/// A blink(1) with gamma correction, pattern playback and a watchdog.
///
/// Safe to share across threads. Closing (or dropping) the controller stops
/// the auto-tickle watchdog, wakes any blocked playback call and closes the
/// device.
pub struct Controller<H: HidHandle + 'static = PlatformHandle> {
    device: Arc<Blink1Device<H>>,
    gamma: AtomicBool,
    options: ControllerOptions,
    /// Serializes multi-report operations issued through the controller.
    ops: Mutex<()>,
    tickle: Mutex<Option<AutoTickle>>,
    shutdown: ShutdownSignal,
}

impl Controller {
    /// Open the first connected blink(1) with default options.
    pub fn open() -> Result<Self> {
        Ok(Self::new(device::open_device()?))
    }

    /// Open the device and apply the options from `config`.
    ///
    /// An invalid config fails with `Blink1Error::Config` before the device
    /// is touched.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        config.check()?;
        let dev = device::open_device_by_serial(&config.device_serial)?;
        Ok(Self::with_options(dev, config.controller_options()))
    }
}

impl<H: HidHandle + 'static> Controller<H> {
    pub fn new(device: Blink1Device<H>) -> Self {
        Self::with_options(device, ControllerOptions::default())
    }

    pub fn with_options(device: Blink1Device<H>, options: ControllerOptions) -> Self {
        Controller {
            device: Arc::new(device),
            gamma: AtomicBool::new(options.gamma),
            options,
            ops: Mutex::new(()),
            tickle: Mutex::new(None),
            shutdown: ShutdownSignal::default(),
        }
    }

    pub fn device(&self) -> &Blink1Device<H> {
        &self.device
    }

    pub fn info(&self) -> &DeviceInfo {
        self.device.info()
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Turn gamma correction of written colors on or off. On by default.
    pub fn set_gamma_correction(&self, on: bool) {
        self.gamma.store(on, Ordering::Relaxed);
    }

    pub fn gamma_correction(&self) -> bool {
        self.gamma.load(Ordering::Relaxed)
    }

    fn correct(&self, rgb: Rgb) -> (u8, u8, u8) {
        if self.gamma_correction() {
            degamma(rgb.r, rgb.g, rgb.b)
        } else {
            rgb.tuple()
        }
    }

    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_tickle(&self) -> MutexGuard<'_, Option<AutoTickle>> {
        self.tickle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_range(&self, start: u8, end: u8) -> Result<()> {
        let max = self.device.max_pattern();
        if !is_pos_range_valid(start, end, max) {
            return Err(Blink1Error::InvalidRange { start, end, max });
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.device.is_closed() {
            return Err(DeviceError::Closed.into());
        }
        Ok(())
    }

    // ── Colors ──

    /// Firmware version as `major * 100 + minor`.
    pub fn firmware_version(&self) -> Result<u16> {
        Ok(self.device.get_version()?)
    }

    /// Fade to `state` and return immediately.
    pub fn play_state(&self, state: &LightState) -> Result<()> {
        let (r, g, b) = self.correct(state.color);
        self.device
            .fade_to_rgb(r, g, b, duration_to_ms(state.fade_time), state.led)?;
        Ok(())
    }

    /// Fade to `state` and wait for the fade the device will actually run.
    pub fn play_state_blocking(&self, state: &LightState) -> Result<()> {
        self.play_state(state)?;
        let fade = actual_fade_duration(state.fade_time);
        if !fade.is_zero() && self.shutdown.wait(Some(fade)) {
            return Err(DeviceError::Closed.into());
        }
        Ok(())
    }

    /// Set all LEDs to `rgb` immediately.
    pub fn play_color(&self, rgb: Rgb) -> Result<()> {
        let (r, g, b) = self.correct(rgb);
        self.device.set_rgb_now(r, g, b, LedIndex::All)?;
        Ok(())
    }

    pub fn play_rgb(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.play_color(Rgb::new(r, g, b))
    }

    /// Set all LEDs from HSB: hue in degrees, saturation and brightness in
    /// percent.
    pub fn play_hsb(&self, hue: f64, saturation: f64, brightness: f64) -> Result<()> {
        self.play_color(color::hsb_to_rgb(hue, saturation, brightness))
    }

    /// Color currently shown by `led`, as reported (no gamma reversal).
    pub fn read_color(&self, led: LedIndex) -> Result<Rgb> {
        Ok(self.device.read_rgb(led)?.into())
    }

    // ── Patterns ──

    /// Write `states` into pattern RAM from `start`, stopping at `end`
    /// (`0` = last line) or when the states run out.
    ///
    /// An empty slice is a no-op. Lines beyond the states are left as is.
    pub fn load_pattern(&self, start: u8, end: u8, states: &[LightState]) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }
        self.check_range(start, end)?;
        let _ops = self.lock_ops();
        self.write_lines(start, end, states)
    }

    fn write_lines(&self, start: u8, end: u8, states: &[LightState]) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }
        let end = protocol::play_loop_end(end, self.device.max_pattern());
        let span = usize::from(end - start) + 1;
        if states.len() > span {
            log::warn!(
                "pattern has {} states but only {span} lines fit in [{start}, {end}]; extra states dropped",
                states.len()
            );
        }

        for (i, (pos, state)) in (start..=end).zip(states).enumerate() {
            if i > 0 {
                std::thread::sleep(self.options.ops_interval);
            }
            let mut line = DeviceLightState::from(state);
            (line.r, line.g, line.b) = self.correct(state.color);
            self.options
                .retry
                .run(|| self.device.set_pattern_line(pos, &line))
                .map_err(|source| Blink1Error::PatternLine { pos, source })?;
        }
        Ok(())
    }

    /// Load the pattern's sequence (if any) and start playing its loop.
    pub fn play_pattern(&self, pattern: &Pattern) -> Result<()> {
        let start = pattern.start_position;
        self.check_range(start, pattern.end_position)?;
        if pattern.repeat_times > MAX_REPEAT {
            return Err(Blink1Error::InvalidRepeat(pattern.repeat_times));
        }
        let end = protocol::play_loop_end(pattern.end_position, self.device.max_pattern());

        let _ops = self.lock_ops();
        self.write_lines(start, end, pattern.sequence.states())?;
        self.device
            .play_loop(true, start, end, pattern.repeat_times as u8)?;
        log::debug!("playing {pattern}");
        Ok(())
    }

    /// [`play_pattern`](Self::play_pattern), then wait for it to finish.
    ///
    /// The wait is the sum of the stored fade times in the loop times the
    /// repeat count; playback itself is not polled.
    ///
    /// With `repeat_times == 0` the pattern loops forever and so does this
    /// call: it returns only when the controller is closed from another
    /// thread, with a `Closed` error. Any wait cut short by `close` returns
    /// the same error.
    pub fn play_pattern_blocking(&self, pattern: &Pattern) -> Result<()> {
        self.play_pattern(pattern)?;

        if pattern.repeat_times == 0 {
            log::warn!("infinite pattern: blocking until the controller is closed");
            self.shutdown.wait(None);
            return Err(DeviceError::Closed.into());
        }

        let start = pattern.start_position;
        let end = protocol::play_loop_end(pattern.end_position, self.device.max_pattern());
        let mut cycle = Duration::ZERO;
        for pos in start..=end {
            let line = self
                .options
                .retry
                .run(|| self.device.read_pattern_line(pos))
                .map_err(|source| Blink1Error::PatternLine { pos, source })?;
            cycle += Duration::from_millis(u64::from(line.fade_msec));
        }

        let total = cycle * pattern.repeat_times;
        log::debug!("waiting {total:?} for pattern to finish");
        let started = Instant::now();
        if self.shutdown.wait(Some(total)) {
            log::debug!("pattern wait interrupted after {:?}", started.elapsed());
            return Err(DeviceError::Closed.into());
        }
        Ok(())
    }

    /// Every line of pattern RAM, in position order.
    pub fn read_pattern(&self) -> Result<StateSequence> {
        let _ops = self.lock_ops();
        (0..self.device.max_pattern())
            .map(|pos| {
                self.options
                    .retry
                    .run(|| self.device.read_pattern_line(pos))
                    .map(LightState::from)
                    .map_err(|source| Blink1Error::PatternLine { pos, source })
            })
            .collect::<Result<Vec<_>>>()
            .map(StateSequence)
    }

    /// Commit pattern RAM to flash so it plays at power-up.
    pub fn write_pattern(&self) -> Result<()> {
        let _ops = self.lock_ops();
        Ok(self.device.save_pattern()?)
    }

    pub fn is_pattern_playing(&self) -> Result<bool> {
        Ok(self.device.read_play_state()?.is_playing)
    }

    pub fn pattern_state(&self) -> Result<PatternState> {
        Ok(self.device.read_play_state()?.into())
    }

    /// Stop any playing loop and turn the LEDs off.
    ///
    /// Does not stop the auto-tickle watchdog; use
    /// [`stop_auto_tickle`](Self::stop_auto_tickle) for that.
    pub fn stop_playing(&self) -> Result<()> {
        self.device.set_tickle_mode(false, false, 0, 0, 0)?;
        Ok(())
    }

    // ── Watchdog ──

    /// Start re-arming the server tickle watchdog every tickle period.
    ///
    /// If the host stops re-arming (process killed, machine hung), the
    /// device plays `[start, end]` on its own once the timeout lapses. A
    /// watchdog that is already running is stopped, final disarm included,
    /// before the new one starts.
    ///
    /// Fails with `InvalidTimeout` before any I/O if the configured tickle
    /// period is below the device's time resolution.
    pub fn start_auto_tickle(&self, start: u8, end: u8, keep: bool) -> Result<()> {
        self.check_range(start, end)?;
        let period = self.options.tickle_period;
        if period < MIN_TIME {
            return Err(Blink1Error::InvalidTimeout(period));
        }
        self.check_open()?;

        let mut slot = self.lock_tickle();
        if let Some(old) = slot.take() {
            log::debug!("replacing running auto tickle");
            old.stop();
        }

        let params = TickleParams {
            start,
            end,
            keep,
            timeout_msec: duration_to_ms(period + period / 2),
        };
        *slot = Some(AutoTickle::spawn(Arc::clone(&self.device), params, period)?);
        Ok(())
    }

    /// Stop the auto-tickle watchdog, if running, after its final disarm.
    pub fn stop_auto_tickle(&self) {
        let old = self.lock_tickle().take();
        if let Some(old) = old {
            old.stop();
        }
    }

    pub fn is_auto_tickling(&self) -> bool {
        self.lock_tickle().is_some()
    }

    /// Arm a watchdog that the caller re-arms with
    /// [`ManualTickle::tickle`] at least once per `timeout`.
    ///
    /// Dropping or stopping the returned handle disarms the device.
    pub fn start_manual_tickle(
        &self,
        start: u8,
        end: u8,
        timeout: Duration,
        keep: bool,
    ) -> Result<ManualTickle> {
        self.check_range(start, end)?;
        if timeout < MIN_TIME {
            return Err(Blink1Error::InvalidTimeout(timeout));
        }
        self.check_open()?;

        let params = TickleParams {
            start,
            end,
            keep,
            timeout_msec: duration_to_ms(timeout),
        };
        ManualTickle::spawn(Arc::clone(&self.device), params)
    }

    // ── Lifecycle ──

    /// Stop the watchdog, wake blocked playback and close the device.
    /// Safe to call more than once.
    pub fn close(&self) {
        self.stop_auto_tickle();
        self.shutdown.trigger();
        self.device.close();
    }

    pub fn is_closed(&self) -> bool {
        self.device.is_closed()
    }
}

impl<H: HidHandle + 'static> Drop for Controller<H> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<H: HidHandle + 'static> fmt::Display for Controller<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device.info())
    }
}

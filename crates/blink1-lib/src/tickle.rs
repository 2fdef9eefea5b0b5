//! Server-tickle watchdog threads.
//!
//! An armed device plays a fallback pattern unless it is re-armed before its
//! timeout runs out. [`AutoTickle`] re-arms on a fixed period; [`ManualTickle`]
//! re-arms whenever its owner calls [`ManualTickle::tickle`]. Both send one
//! final disarm when they stop.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::{Blink1Device, DeviceError, HidHandle};
use crate::error::Result;

/// What the device plays if the watchdog is not re-armed in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickleParams {
    pub start: u8,
    /// Inclusive end position; 0 means the last line.
    pub end: u8,
    /// Keep the currently playing pattern while armed.
    pub keep: bool,
    pub timeout_msec: u32,
}

/// Re-arm once. `Closed` ends the watchdog; other errors are logged.
fn arm<H: HidHandle>(device: &Blink1Device<H>, params: &TickleParams) -> bool {
    match device.set_tickle_mode(
        true,
        params.keep,
        params.start,
        params.end,
        params.timeout_msec,
    ) {
        Ok(()) => true,
        Err(DeviceError::Closed) => {
            log::debug!("tickle: device closed, watchdog exiting");
            false
        }
        Err(e) => {
            log::warn!("tickle: re-arm failed: {e}");
            true
        }
    }
}

fn disarm<H: HidHandle>(device: &Blink1Device<H>, params: &TickleParams) {
    match device.set_tickle_mode(false, params.keep, 0, 0, 0) {
        Ok(()) => log::info!("tickle: disarmed"),
        Err(e) => log::warn!("tickle: final disarm failed: {e}"),
    }
}

fn join_worker(thread: Option<JoinHandle<()>>) {
    if let Some(t) = thread
        && t.join().is_err()
    {
        log::warn!("tickle thread panicked");
    }
}

// ── Periodic ──

/// Background thread re-arming the watchdog every `period`.
///
/// Stopping (explicitly or by drop) wakes the thread, which disarms the
/// device before exiting. `stop` returns only after that disarm was sent.
pub struct AutoTickle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AutoTickle {
    pub fn spawn<H: HidHandle + 'static>(
        device: Arc<Blink1Device<H>>,
        params: TickleParams,
        period: Duration,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("blink1-auto-tickle".into())
            .spawn(move || {
                log::info!("auto tickle started: {params:?} every {period:?}");
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !arm(&device, &params) {
                                return;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                disarm(&device, &params);
            })?;
        Ok(AutoTickle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for its final disarm.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        join_worker(self.thread.take());
    }
}

impl Drop for AutoTickle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Caller-driven ──

/// Watchdog re-armed on demand.
///
/// Each [`tickle`](Self::tickle) re-arms the device with the configured
/// timeout. Dropping the handle or calling [`stop`](Self::stop) disarms it.
#[derive(Debug)]
pub struct ManualTickle {
    tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ManualTickle {
    pub fn spawn<H: HidHandle + 'static>(
        device: Arc<Blink1Device<H>>,
        params: TickleParams,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("blink1-manual-tickle".into())
            .spawn(move || {
                log::info!("manual tickle started: {params:?}");
                for () in rx {
                    if !arm(&device, &params) {
                        return;
                    }
                }
                disarm(&device, &params);
            })?;
        Ok(ManualTickle {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Re-arm the watchdog. Returns `false` once the worker has exited
    /// (device closed).
    pub fn tickle(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Disarm and wait for the worker to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.tx.take());
        join_worker(self.thread.take());
    }
}

impl Drop for ManualTickle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock;
    use crate::protocol::CMD_SERVER_TICKLE;

    const PERIOD: Duration = Duration::from_millis(20);

    fn params() -> TickleParams {
        TickleParams {
            start: 1,
            end: 4,
            keep: true,
            timeout_msec: 30,
        }
    }

    fn tickles(mock: &mock::MockHandle) -> Vec<Vec<u8>> {
        mock.writes_with_opcode(CMD_SERVER_TICKLE)
    }

    #[test]
    fn auto_tickle_arms_periodically_then_disarms() {
        let (dev, mock) = mock::device(2);
        let tickle = AutoTickle::spawn(Arc::new(dev), params(), PERIOD).unwrap();
        std::thread::sleep(PERIOD * 5);
        tickle.stop();

        let writes = tickles(&mock);
        assert!(writes.len() >= 3, "got {} writes", writes.len());
        let (last, armed) = writes.split_last().unwrap();
        assert_eq!(last, &vec![0x01, b'D', 0, 0, 0, 1, 0, 32, 0]);
        for w in armed {
            assert_eq!(w, &vec![0x01, b'D', 1, 0, 3, 1, 1, 5, 0]);
        }
    }

    #[test]
    fn auto_tickle_stop_before_first_tick_only_disarms() {
        let (dev, mock) = mock::device(2);
        let tickle = AutoTickle::spawn(Arc::new(dev), params(), Duration::from_secs(60)).unwrap();
        tickle.stop();
        let writes = tickles(&mock);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0][2], 0);
    }

    #[test]
    fn auto_tickle_drop_disarms() {
        let (dev, mock) = mock::device(2);
        drop(AutoTickle::spawn(Arc::new(dev), params(), Duration::from_secs(60)).unwrap());
        assert_eq!(tickles(&mock).len(), 1);
    }

    #[test]
    fn auto_tickle_survives_write_errors() {
        let (dev, mock) = mock::device(2);
        mock.fail_next_writes(2);
        let tickle = AutoTickle::spawn(Arc::new(dev), params(), PERIOD).unwrap();
        std::thread::sleep(PERIOD * 6);
        tickle.stop();
        let writes = tickles(&mock);
        assert!(writes.len() >= 4);
        assert_eq!(writes.last().unwrap()[2], 0);
    }

    #[test]
    fn auto_tickle_exits_when_device_closes() {
        let (dev, mock) = mock::device(2);
        let dev = Arc::new(dev);
        let tickle = AutoTickle::spawn(Arc::clone(&dev), params(), PERIOD).unwrap();
        dev.close();
        std::thread::sleep(PERIOD * 3);
        tickle.stop();
        assert!(tickles(&mock).is_empty());
    }

    #[test]
    fn manual_tickle_arms_per_signal() {
        let (dev, mock) = mock::device(2);
        let tickle = ManualTickle::spawn(Arc::new(dev), params()).unwrap();
        assert!(tickle.tickle());
        assert!(tickle.tickle());
        assert!(tickle.tickle());
        tickle.stop();

        let writes = tickles(&mock);
        assert_eq!(writes.len(), 4);
        assert!(writes[..3].iter().all(|w| w[2] == 1));
        assert_eq!(writes[3][2], 0);
    }

    #[test]
    fn manual_tickle_drop_disarms() {
        let (dev, mock) = mock::device(1);
        drop(ManualTickle::spawn(Arc::new(dev), params()).unwrap());
        let writes = tickles(&mock);
        assert_eq!(writes, vec![vec![0x01, b'D', 0, 0, 0, 1, 0, 12, 0]]);
    }

    #[test]
    fn manual_tickle_reports_dead_worker() {
        let (dev, _mock) = mock::device(2);
        let dev = Arc::new(dev);
        let tickle = ManualTickle::spawn(Arc::clone(&dev), params()).unwrap();
        dev.close();
        assert!(tickle.tickle());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!tickle.tickle());
    }
}

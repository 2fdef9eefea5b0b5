//! `tickle` subcommand: keep the server-tickle watchdog armed until Ctrl+C.

use std::sync::atomic::Ordering;

use super::{Controller, POLL_INTERVAL, RUNNING, Result};

/// Arm the watchdog and re-arm it every tickle period until interrupted.
///
/// If this process dies without disarming, the device plays `[start, end]`
/// on its own once the timeout lapses.
pub(super) fn cmd_tickle(ctl: &Controller, start: u8, end: u8, keep: bool) -> Result<()> {
    ctl.start_auto_tickle(start, end, keep)?;
    let period = ctl.options().tickle_period;
    println!(
        "Watchdog armed: positions {start}..{end}, re-armed every {}ms. Press Ctrl+C to stop.",
        period.as_millis()
    );

    while RUNNING.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
    }

    ctl.stop_auto_tickle();
    println!("Watchdog disarmed.");
    Ok(())
}

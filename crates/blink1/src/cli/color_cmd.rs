//! `fade`, `set` and `read` subcommands: single-color control.

use std::sync::Arc;
use std::time::Duration;

use super::{ColorOutput, Controller, HidHandle, LedIndex, Result, close_on_interrupt, color, print_json};
use blink1_lib::LightState;

/// Fade and wait for it to finish. Ctrl+C stops the wait, not the fade.
pub(super) fn cmd_fade<H: HidHandle + 'static>(
    ctl: Controller<H>,
    text: &str,
    led: LedIndex,
    fade: Duration,
) -> Result<()> {
    let rgb = color::parse_color(text)?;
    let state = LightState::new(rgb, fade, led);

    let ctl = Arc::new(ctl);
    close_on_interrupt(&ctl);
    let result = ctl.play_state_blocking(&state);
    ctl.close();
    match result {
        Err(e) if e.is_closed() => println!("Interrupted."),
        Err(e) => return Err(e),
        Ok(()) => println!(
            "Faded {led} to {} over {}ms",
            color::name_or_hex(rgb),
            fade.as_millis()
        ),
    }
    Ok(())
}

pub(super) fn cmd_set(ctl: &Controller, text: &str) -> Result<()> {
    let rgb = color::parse_color(text)?;
    ctl.play_color(rgb)?;
    println!("Set color {}", color::name_or_hex(rgb));
    Ok(())
}

pub(super) fn cmd_read(ctl: &Controller, led: LedIndex, json: bool) -> Result<()> {
    let rgb = ctl.read_color(led)?;
    let name = color::color_name(rgb);

    if json {
        return print_json(&ColorOutput {
            led,
            color: rgb,
            name: name.map(str::to_string),
        });
    }

    match name {
        Some(name) => println!("{led}: {} ({name})", color::format_color(rgb)),
        None => println!("{led}: {}", color::format_color(rgb)),
    }
    Ok(())
}

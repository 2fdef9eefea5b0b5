//! `play`, `state`, `read-pattern`, `save` and `stop` subcommands.

use std::sync::Arc;

use super::{
    Controller, PatternLineJson, PatternState, ReadPatternOutput, Result, close_on_interrupt,
    color, kv_indent, kv_width, print_json,
};
use blink1_lib::{Pattern, StateSequence};

pub(super) struct PlayArgs {
    pub sequence: String,
    pub start: u8,
    pub end: u8,
    pub repeat: u32,
    pub wait: bool,
}

/// Load and play a sequence. With `--wait`, block until it finishes or
/// Ctrl+C is pressed.
pub(super) fn cmd_play(ctl: Controller, args: PlayArgs) -> Result<()> {
    let sequence: StateSequence = args.sequence.parse()?;
    let pattern = Pattern {
        start_position: args.start,
        end_position: args.end,
        repeat_times: args.repeat,
        sequence,
    };

    if !args.wait {
        ctl.play_pattern(&pattern)?;
        println!("Playing {pattern}");
        return Ok(());
    }

    let ctl = Arc::new(ctl);
    close_on_interrupt(&ctl);
    println!("Playing {pattern} (Ctrl+C to stop waiting)");
    let result = ctl.play_pattern_blocking(&pattern);
    ctl.close();
    match result {
        Err(e) if e.is_closed() => {
            println!("Interrupted.");
            Ok(())
        }
        Err(e) => Err(e),
        Ok(()) => {
            println!("Done.");
            Ok(())
        }
    }
}

pub(super) fn cmd_state(ctl: &Controller, json: bool) -> Result<()> {
    let state: PatternState = ctl.pattern_state()?;
    if json {
        return print_json(&state);
    }
    println!("Pattern {state}");
    Ok(())
}

pub(super) fn cmd_read_pattern(ctl: &Controller, json: bool) -> Result<()> {
    let sequence = ctl.read_pattern()?;

    if json {
        let lines = sequence
            .states()
            .iter()
            .enumerate()
            .map(|(position, st)| PatternLineJson {
                position,
                color: st.color,
                led: st.led,
                fade_ms: st.fade_time.as_millis(),
            })
            .collect();
        return print_json(&ReadPatternOutput {
            capacity: sequence.len(),
            lines,
        });
    }

    println!("Pattern RAM ({} lines):", sequence.len());
    let w = kv_width(&[], &["[00]"]);
    for (pos, st) in sequence.states().iter().enumerate() {
        kv_indent(
            &format!("[{pos:02}]"),
            format_args!(
                "{}  {}  {}ms",
                color::name_or_hex(st.color),
                st.led,
                st.fade_time.as_millis()
            ),
            w,
        );
    }
    println!();
    println!("As sequence: {sequence}");
    Ok(())
}

pub(super) fn cmd_save(ctl: &Controller) -> Result<()> {
    ctl.write_pattern()?;
    println!("Pattern saved to flash.");
    Ok(())
}

pub(super) fn cmd_stop(ctl: &Controller) -> Result<()> {
    ctl.stop_playing()?;
    println!("Stopped.");
    Ok(())
}

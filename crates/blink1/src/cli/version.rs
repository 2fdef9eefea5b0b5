//! `version` and `test` subcommands: device identity and diagnostics.

use super::{Controller, Result, VersionOutput, kv, kv_width, print_json};

pub(super) fn cmd_version(ctl: &Controller, json: bool) -> Result<()> {
    let firmware = ctl.firmware_version()?;
    let info = ctl.info();

    if json {
        return print_json(&VersionOutput {
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            device: info.clone(),
            firmware,
        });
    }

    let w = kv_width(
        &["CLI:", "Device:", "Path:", "Serial:", "Firmware:", "Pattern RAM:"],
        &[],
    );
    kv("CLI:", env!("CARGO_PKG_VERSION"), w);
    kv("Device:", format_args!("{} (gen {})", info.product, info.generation), w);
    kv("Path:", &info.path, w);
    kv("Serial:", info.serial.as_deref().unwrap_or("(none)"), w);
    kv("Firmware:", format_args!("v{firmware}"), w);
    kv("Pattern RAM:", format_args!("{} lines", info.max_pattern()), w);
    Ok(())
}

/// Send `!` and print the echoed report.
pub(super) fn cmd_test(ctl: &Controller) -> Result<()> {
    let report = ctl.device().test()?;
    let hex: Vec<String> = report.iter().map(|b| format!("{b:02x}")).collect();
    println!("Test report: {}", hex.join(" "));
    Ok(())
}

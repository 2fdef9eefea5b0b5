//! `devices` subcommand: list connected blink(1) devices.

use super::{DevicesOutput, Result, device, print_json};

pub(super) fn cmd_devices(json: bool) -> Result<()> {
    let devices = device::enumerate_devices();

    if json {
        return print_json(&DevicesOutput {
            count: devices.len(),
            devices,
        });
    }

    if devices.is_empty() {
        println!("No blink(1) devices found.");
        return Ok(());
    }

    println!(
        "Found {} blink(1) device{}:",
        devices.len(),
        if devices.len() == 1 { "" } else { "s" }
    );
    println!();

    for (i, dev) in devices.iter().enumerate() {
        println!("  [{}] {} (gen {})", i + 1, dev.product, dev.generation);
        println!("      Path:   {}", dev.path);
        if let Some(ref serial) = dev.serial {
            println!("      Serial: {serial}");
        }
    }

    Ok(())
}

//! `config` subcommand: show current configuration and file path.

use std::path::Path;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width, print_json};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => vec![],
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if json {
        return print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            problems,
        });
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "device_serial:",
            "gamma_correction:",
            "tickle_period_ms:",
            "ops_interval_ms:",
            "retry_attempts:",
            "default_fade_ms:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let serial = if config.device_serial.is_empty() {
        "(first device found)"
    } else {
        config.device_serial.as_str()
    };
    kv_indent("device_serial:", serial, w);
    kv_indent("gamma_correction:", config.gamma_correction, w);
    kv_indent("tickle_period_ms:", config.tickle_period_ms, w);
    kv_indent("ops_interval_ms:", config.ops_interval_ms, w);
    kv_indent("retry_attempts:", config.retry_attempts, w);
    kv_indent("default_fade_ms:", config.default_fade_ms, w);

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}

//! blink1-cli: command-line control for blink(1) USB RGB LED notification lights.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

mod cli;

/// Shared shutdown flag, cleared by the Ctrl+C handler.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "blink1-cli",
    version,
    about = "Command-line control for blink(1) USB RGB LED notification lights"
)]
struct Args {
    /// Output as JSON (for devices, version, read, state, read-pattern, config)
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (every report written and read)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a config file other than the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    ctrlc::set_handler(move || {
        RUNNING.store(false, Ordering::SeqCst);
    })
    .ok();

    let opts = cli::GlobalOpts {
        json: args.json,
        config_path: args.config,
    };
    if let Err(e) = cli::run(args.command, &opts) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

//! rsp-tcp daemon entry point
//!
//! Loads the TOML configuration, wires the shutdown signal, creates the
//! receiver backend, and runs the accept/serve loop until interrupted.
//! Transport failures keep the server alive; a receiver initialization
//! failure exits with a non-zero status.

use rsp_tcp::device::create_device;
use rsp_tcp::{Config, Error, Result, Server};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_CONFIG_PATH: &str = "/etc/rsp-tcp.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `rsp-tcp <path>` (positional)
/// - `rsp-tcp --config <path>` (flag-based)
/// - `rsp-tcp -c <path>` (short flag)
///
/// Returns `None` when no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    // An explicitly passed config must exist; the default path may not
    let config = match parse_config_path() {
        Some(path) => Config::from_file(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::from_file(DEFAULT_CONFIG_PATH)?
        }
        None => Config::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    log::info!("rsp-tcp v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!(
        "tuner: {} Hz, {} sps, gain {}, driver '{}'",
        config.tuner.frequency_hz,
        config.tuner.sample_rate_hz,
        config.tuner.gain,
        config.tuner.driver
    );

    // Process shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("signal caught, exiting");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("failed to set signal handler: {e}")))?;

    let device = create_device(&config.tuner)?;
    let mut server = Server::new(config, device, running)?;
    server.run()?;

    log::info!("bye!");
    Ok(())
}

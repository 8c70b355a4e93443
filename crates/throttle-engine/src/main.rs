//! # Throttle
//!
//! Runs the endless driving simulation headless and prints a JSON summary.
//!
//! Usage: `throttle [CONFIG]`, where `CONFIG` defaults to `throttle.toml`.
//! Set `THROTTLE_LOG_FORMAT=json` for JSON log lines.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::Result;
use throttle_engine::{EngineConfig, Runner, CONFIG_FILE};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    init_tracing()?;

    info!("Throttle starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = EngineConfig::load_from(&path);
    config.validate();

    let summary = Runner::new(config)?.run();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("Throttle shutdown complete");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("throttle=info".parse()?);
    let json = std::env::var("THROTTLE_LOG_FORMAT").is_ok_and(|format| format == "json");

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}

//! Logging setup for the `forkexec` CLI using `tracing` + `tracing-subscriber`.
//!
//! - `RUST_LOG` selects the filter (default `forkexec=info`)
//! - `FORKEXEC_LOG_FORMAT=json` switches to JSON lines, anything else is pretty
//!
//! Logs go to STDERR so the child's stdout passes through untouched.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "forkexec=info";

pub fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("FORKEXEC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install JSON subscriber")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install pretty subscriber")?;
        }
    }

    Ok(())
}

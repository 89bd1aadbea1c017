// Logging module for structured logging using the tracing crate

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for structured logging
///
/// Filtering follows `RUST_LOG` (default `info`). Output goes to stdout
/// for container/cloud-native deployments; pass `json = true` for log
/// aggregation systems.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_subscriber(json: bool) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| -> Box<dyn Error> { e })?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| -> Box<dyn Error> { e })?;
    }
    Ok(())
}

//! Shared helpers for command handlers.

use std::time::Duration;

use kilosync_core::{Engine, EngineConfig};
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Apply the configuration and wait (bounded by `--wait`) until the
/// engine is polling.
pub async fn connect(
    engine: &Engine,
    config: &EngineConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    engine.apply_config(config)?;

    let wait = Duration::from_secs(global.wait);
    match tokio::time::timeout(wait, engine.wait_until_active()).await {
        Ok(result) => {
            result?;
            debug!(address = %config.address, "device connected");
            Ok(())
        }
        Err(_) => Err(CliError::ConnectionFailed {
            address: config.address.clone(),
            reason: engine.status().to_string(),
        }),
    }
}

//! Subscriber setup for embedding applications and tests.
//!
//! The loader itself only emits `tracing` events; whoever embeds it decides
//! where they go. This helper installs a formatted subscriber once.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::core::errors::{LoaderError, Result};

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns an error if the filter does not parse. A subscriber that is already
/// installed is left in place.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| LoaderError::configuration_field(e.to_string(), "filter"))?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

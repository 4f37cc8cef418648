//! Tracing subscriber setup.

use crate::config::LogFormat;
use tracing_subscriber::filter::{EnvFilter, ParseError};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this again once a
/// subscriber is installed is a no-op.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), ParseError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(filter)
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

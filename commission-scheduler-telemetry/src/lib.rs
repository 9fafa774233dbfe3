//! Subscriber setup shared by the service and the worker processes.

use std::io;

use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::Layer;

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("tracing is already set up: {0}")]
    Init(#[from] TryInitError),
}

/// `RUST_LOG` wins over `default_filter`.
pub fn env_filter(default_filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| Ok(EnvFilter::try_new(default_filter)?))
}

/// Installs a fmt layer on stderr.
///
/// Stdout stays free for command output, and in worker processes for the
/// solver log.
pub fn setup_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true);
    tracing_subscriber::registry()
        .with(stderr_log.with_filter(env_filter(default_filter)?))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filters() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(
                env_filter("solver=loud"),
                Err(TelemetryError::Filter(_))
            ));
        }
        assert!(env_filter("info,solver=debug").is_ok());
    }

    #[test]
    fn second_setup_fails() {
        setup_tracing("warn").unwrap();
        let second = setup_tracing("warn");
        assert!(matches!(second, Err(TelemetryError::Init(_))));
    }
}

//! Process-wide log output.
//!
//! Library code logs through both the `log` macros and `tracing` spans; this
//! installs one subscriber for both. Filtering follows `RUST_LOG`, falling
//! back to `info`.

use tracing_subscriber::EnvFilter;

use crate::error::RedraftError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber. Fails (without panicking) if one is
/// already installed.
pub fn init(format: LogFormat) -> Result<(), RedraftError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Plain => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| RedraftError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| RedraftError::Logging(e.to_string()))
}

/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::ClientConfig;
use crate::error::{Result, SmbError};

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: &ClientConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)
    } else {
        init_stderr_logging(env_filter)
    }
}

fn effective_level(config: &ClientConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

fn build_filter(config: &ClientConfig) -> Result<EnvFilter> {
    let log_level = effective_level(config);
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("smbstream={}", log_level)))
        .map_err(|e| SmbError::Config(format!("Failed to create log filter: {}", e)))
}

/// Initialize logging to stderr, keeping stdout for data
fn init_stderr_logging(env_filter: EnvFilter) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SmbError::Config(format!("Failed to install subscriber: {}", e)))
}

/// Initialize logging to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| SmbError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false) // No ANSI colors in file
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SmbError::Config(format!("Failed to install subscriber: {}", e)))
}

/// Initialize logging with custom format for testing
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("smbstream=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}

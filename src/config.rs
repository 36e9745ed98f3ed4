/*!
 * Configuration types for smbstream
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SmbError};

/// 64 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// 2 MiB
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Read-ahead applied by `open_for_streaming`
pub const STREAMING_READ_AHEAD: usize = 2 * 1024 * 1024;

/// Streaming tuning carried by every file session
///
/// These are hints for chunked read loops built on top of `read` and
/// `read_range`; they do not change what goes over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingOptions {
    /// Bytes requested per remote read in chunked loops
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Upper bound for a single buffered range
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Allow callers to cache fetched ranges
    #[serde(default = "default_true")]
    pub enable_caching: bool,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            enable_caching: true,
        }
    }
}

impl StreamingOptions {
    pub fn new(chunk_size: usize, buffer_size: usize, enable_caching: bool) -> Self {
        Self {
            chunk_size,
            buffer_size,
            enable_caching,
        }
    }

    /// Reject zero sizes and a chunk that does not fit in the buffer
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SmbError::InvalidParameter(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(SmbError::InvalidParameter(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size > self.buffer_size {
            return Err(SmbError::InvalidParameter(format!(
                "chunk_size {} exceeds buffer_size {}",
                self.chunk_size, self.buffer_size
            )));
        }
        Ok(())
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    #[default]
    Warn,

    /// Info, warnings, and errors
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse the small integer levels used by the C bridge (0 = error .. 4 = trace)
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            i32::MIN..=0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Client-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Defaults copied into every new file session
    #[serde(default)]
    pub streaming: StreamingOptions,

    /// Read-ahead applied when a file is opened for streaming
    #[serde(default = "default_streaming_read_ahead")]
    pub streaming_read_ahead: usize,

    /// Read-ahead applied by a plain open (0 = no hint)
    #[serde(default)]
    pub default_read_ahead: usize,

    /// Domain used when a connect call does not supply one
    #[serde(default)]
    pub default_domain: String,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            streaming: StreamingOptions::default(),
            streaming_read_ahead: STREAMING_READ_AHEAD,
            default_read_ahead: 0,
            default_domain: String::new(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_streaming_read_ahead() -> usize {
    STREAMING_READ_AHEAD
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| SmbError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| SmbError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.streaming
            .validate()
            .map_err(|e| SmbError::Config(e.to_string()))
    }

    /// Larger chunks for high-bitrate media over a fast LAN
    pub fn streaming_preset() -> Self {
        Self {
            streaming: StreamingOptions {
                chunk_size: 1024 * 1024,
                buffer_size: 8 * 1024 * 1024,
                enable_caching: true,
            },
            streaming_read_ahead: 8 * 1024 * 1024,
            ..Default::default()
        }
    }
}

/*!
 * smbstream - read-only SMB2/3 streaming client
 *
 * A handle-based client for media playback over network shares:
 * - Generational handle registry for connections and open files
 * - Seek-then-read range engine for scrub-capable players
 * - Directory listing with guaranteed handle release
 * - C-ABI bridge with caller-owned results and paired free calls
 * - Pluggable transport (in-memory share, native SMB2/3 behind `smb-native`)
 *
 * Version: 0.3.0
 */

pub mod client;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod registry;
pub mod session;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use client::{SessionInfo, SmbClient};
pub use config::{ClientConfig, LogLevel, StreamingOptions};
pub use connection::Connection;
pub use directory::{list_directory, DirectoryEntry};
pub use error::{error_message, ErrorCode, Result, SmbError};
pub use registry::{ConnectionId, HandleRegistry, SessionId};
pub use session::{FileSession, SessionState};
pub use streaming::SessionReader;
pub use transport::{Connector, Credentials, Dialect, ShareTarget};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}

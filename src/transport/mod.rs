//! Remote protocol seam
//!
//! The core treats SMB2 as a black box with connect/open/read/seek/stat and
//! enumerate primitives. Implementations:
//!
//! - [`memory::MemoryShare`] - in-memory share for tests and offline use
//! - `smb2::Smb2Connector` - real SMB2/3 client on the `smb` crate
//!   (requires the `smb-native` feature)
//!
//! All calls block the caller until the remote round-trip completes.

pub mod memory;
pub mod ntstatus;

#[cfg(feature = "smb-native")]
pub mod smb2;

use std::fmt;
use zeroize::Zeroize;

use crate::error::{Result, SmbError};

/// Secret wrapper for credentials
///
/// Zeroes its memory on drop and never prints its contents.
#[derive(Clone, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Credentials fixed for the lifetime of a connection
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
    /// Empty when no domain is used
    pub domain: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            domain: String::new(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// `DOMAIN\user` when a domain is set, bare user otherwise
    pub fn qualified_username(&self) -> String {
        if self.domain.is_empty() {
            self.username.clone()
        } else {
            format!("{}\\{}", self.domain, self.username)
        }
    }
}

/// One server + share, plus the credentials to reach it
#[derive(Debug, Clone)]
pub struct ShareTarget {
    pub server: String,
    pub share: String,
    pub credentials: Credentials,
}

impl ShareTarget {
    pub fn new(
        server: impl Into<String>,
        share: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            server: server.into(),
            share: share.into(),
            credentials,
        }
    }

    /// Server and share must be non-empty; the share is a single component
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(SmbError::InvalidParameter(
                "server cannot be empty".to_string(),
            ));
        }
        if self.share.trim().is_empty() {
            return Err(SmbError::InvalidParameter(
                "share cannot be empty".to_string(),
            ));
        }
        if self.share.contains(['/', '\\']) {
            return Err(SmbError::InvalidParameter(format!(
                "share must be a single name, got {}",
                self.share
            )));
        }
        Ok(())
    }

    /// Canonical share URL: `smb://server/share`
    pub fn share_url(&self) -> String {
        format!("smb://{}/{}", self.server, self.share)
    }
}

/// Negotiated protocol dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Smb202,
    Smb210,
    Smb300,
    Smb302,
    Smb311,
    /// Negotiated something we do not name
    Other,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Smb202 => "SMB2.0.2",
            Dialect::Smb210 => "SMB2.1",
            Dialect::Smb300 => "SMB3.0",
            Dialect::Smb302 => "SMB3.0.2",
            Dialect::Smb311 => "SMB3.1.1",
            Dialect::Other => "SMB2.x",
        }
    }

    /// Map a wire dialect revision
    pub fn from_revision(revision: u16) -> Self {
        match revision {
            0x0202 => Dialect::Smb202,
            0x0210 => Dialect::Smb210,
            0x0300 => Dialect::Smb300,
            0x0302 => Dialect::Smb302,
            0x0311 => Dialect::Smb311,
            _ => Dialect::Other,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata for a single remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteStat {
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: u64,
    pub is_directory: bool,
}

/// One raw directory entry as produced by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    pub name: String,
    pub stat: RemoteStat,
}

/// Opens authenticated share sessions
pub trait Connector: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &str;

    /// Perform the connect handshake and tree connect
    fn connect(&self, target: &ShareTarget) -> Result<Box<dyn ShareTransport>>;
}

/// One authenticated session to a server share
pub trait ShareTransport: Send {
    fn dialect(&self) -> Dialect;

    /// Open a file read-only; paths are normalized share-relative
    fn open_read(&mut self, path: &str) -> Result<Box<dyn RemoteFile>>;

    fn open_dir(&mut self, path: &str) -> Result<Box<dyn RemoteDir>>;

    fn stat(&mut self, path: &str) -> Result<RemoteStat>;

    /// Tear down the session; further calls fail
    fn disconnect(&mut self) -> Result<()>;
}

/// An open remote file with seek-then-sequential-read semantics
pub trait RemoteFile: Send {
    /// Absolute seek from start; past-EOF offsets are allowed
    fn seek(&mut self, offset: u64) -> Result<u64>;

    /// Read from the current offset, advancing it; `Ok(0)` at EOF
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Query remote metadata for the file length
    fn size(&mut self) -> Result<u64>;

    /// Release the remote handle
    fn close(&mut self) -> Result<()>;
}

/// An open remote directory stream
///
/// `Err(SmbError::Protocol(_))` marks a single malformed entry; any other
/// error ends the enumeration.
pub trait RemoteDir: Send {
    fn next_entry(&mut self) -> Option<Result<RemoteDirEntry>>;

    fn close(&mut self) -> Result<()>;
}

/// Normalize a caller path to a share-relative form
///
/// Accepts `/` and `\` separators, drops empty and `.` components and
/// rejects `..`. The share root is the empty string.
pub fn normalize_path(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(SmbError::InvalidParameter(format!(
                    "path traversal not allowed: {}",
                    path
                )))
            }
            p => parts.push(p),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug() {
        let secret = Secret::new("password123");
        let debug_str = format!("{:?}", secret);
        assert!(!debug_str.contains("password123"));
        assert!(debug_str.contains("REDACTED"));
        assert_eq!(secret.expose(), "password123");
    }

    #[test]
    fn test_qualified_username() {
        let creds = Credentials::new("alice", "secret");
        assert_eq!(creds.qualified_username(), "alice");
        let creds = creds.with_domain("CORP");
        assert_eq!(creds.qualified_username(), "CORP\\alice");
    }

    #[test]
    fn test_target_validation() {
        let creds = Credentials::new("alice", "secret");
        assert!(ShareTarget::new("fileserver", "share1", creds.clone())
            .validate()
            .is_ok());
        assert!(ShareTarget::new("", "share1", creds.clone()).validate().is_err());
        assert!(ShareTarget::new("fileserver", " ", creds.clone())
            .validate()
            .is_err());
        assert!(ShareTarget::new("fileserver", "a/b", creds).validate().is_err());
    }

    #[test]
    fn test_share_url() {
        let target = ShareTarget::new("fileserver", "share1", Credentials::default());
        assert_eq!(target.share_url(), "smb://fileserver/share1");
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::from_revision(0x0311).name(), "SMB3.1.1");
        assert_eq!(Dialect::from_revision(0x0210).name(), "SMB2.1");
        assert_eq!(Dialect::from_revision(0x02ff), Dialect::Other);
        assert_eq!(Dialect::Other.to_string(), "SMB2.x");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/videos/movie.mp4").unwrap(), "videos/movie.mp4");
        assert_eq!(normalize_path("\\videos\\\\movie.mp4").unwrap(), "videos/movie.mp4");
        assert_eq!(normalize_path("./a/./b/").unwrap(), "a/b");
        assert_eq!(normalize_path("/").unwrap(), "");
        assert_eq!(normalize_path("").unwrap(), "");
        assert!(normalize_path("a/../../etc/passwd").is_err());
        assert_eq!(normalize_path("a/..b").unwrap(), "a/..b");
    }
}

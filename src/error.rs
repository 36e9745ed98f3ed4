/*!
 * Error types for smbstream
 */

use std::ffi::CStr;

use thiserror::Error;

/// Result type for SMB operations
pub type Result<T> = std::result::Result<T, SmbError>;

/// SMB client errors
///
/// Remote protocol failures are mapped into this taxonomy at the
/// connection/session boundary. The bridge collapses them further into an
/// [`ErrorCode`].
#[derive(Error, Debug)]
pub enum SmbError {
    /// Network failure or handshake rejected
    #[error("connection error: {0}")]
    Connection(String),

    /// Credentials rejected by the server
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote path does not exist
    #[error("path not found: {0}")]
    NotFound(String),

    /// Remote path exists but access was refused
    #[error("permission denied: {0}")]
    Permission(String),

    /// Null, empty or otherwise malformed argument
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Result marshalling could not allocate
    #[error("memory allocation failed")]
    MemoryAllocation,

    /// Reserved: no media decoder is shipped
    #[error("thumbnail generation failed: {0}")]
    ThumbnailGeneration(String),

    /// Operation issued on a connection that is no longer connected
    #[error("not connected")]
    NotConnected,

    /// Handle id unknown to the registry (never issued, closed or disconnected)
    #[error("stale {kind} handle: {raw:#x}")]
    StaleHandle { kind: &'static str, raw: u64 },

    /// File session was already closed
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote protocol returned something we could not interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unsupported feature or operation
    #[error("unsupported feature: {0}")]
    Unsupported(&'static str),

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl SmbError {
    /// Bridge error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            SmbError::Connection(_)
            | SmbError::NotConnected
            | SmbError::Io(_)
            | SmbError::Protocol(_) => ErrorCode::Connection,
            SmbError::Auth(_) => ErrorCode::Authentication,
            SmbError::NotFound(_) | SmbError::StaleHandle { .. } | SmbError::SessionClosed(_) => {
                ErrorCode::FileNotFound
            }
            SmbError::Permission(_) => ErrorCode::PermissionDenied,
            SmbError::InvalidParameter(_) | SmbError::Config(_) => ErrorCode::InvalidParameter,
            SmbError::MemoryAllocation => ErrorCode::MemoryAllocation,
            SmbError::ThumbnailGeneration(_) => ErrorCode::ThumbnailGeneration,
            SmbError::Unsupported(_) => ErrorCode::Unknown,
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SmbError::Connection(_) | SmbError::Io(_) | SmbError::Protocol(_)
        )
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        matches!(self, SmbError::Permission(_) | SmbError::Auth(_))
    }

    /// Check if this error indicates the resource or handle doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SmbError::NotFound(_) | SmbError::StaleHandle { .. } | SmbError::SessionClosed(_)
        )
    }
}

/// Integer error codes exchanged across the C boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success = 0,
    Connection = -1,
    Authentication = -2,
    FileNotFound = -3,
    PermissionDenied = -4,
    InvalidParameter = -5,
    MemoryAllocation = -6,
    ThumbnailGeneration = -7,
    Unknown = -999,
}

impl ErrorCode {
    /// Map a raw code; anything unrecognised becomes `Unknown`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => ErrorCode::Success,
            -1 => ErrorCode::Connection,
            -2 => ErrorCode::Authentication,
            -3 => ErrorCode::FileNotFound,
            -4 => ErrorCode::PermissionDenied,
            -5 => ErrorCode::InvalidParameter,
            -6 => ErrorCode::MemoryAllocation,
            -7 => ErrorCode::ThumbnailGeneration,
            _ => ErrorCode::Unknown,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Fixed message as a static C string; the bridge hands these out as-is
    pub fn message_c_str(self) -> &'static CStr {
        match self {
            ErrorCode::Success => c"Success",
            ErrorCode::Connection => c"Connection error",
            ErrorCode::Authentication => c"Authentication failed",
            ErrorCode::FileNotFound => c"File not found",
            ErrorCode::PermissionDenied => c"Permission denied",
            ErrorCode::InvalidParameter => c"Invalid parameter",
            ErrorCode::MemoryAllocation => c"Memory allocation failed",
            ErrorCode::ThumbnailGeneration => c"Thumbnail generation failed",
            ErrorCode::Unknown => c"Unknown error",
        }
    }

    /// Fixed human-readable message
    pub fn message(self) -> &'static str {
        self.message_c_str().to_str().unwrap_or("Unknown error")
    }
}

impl From<&SmbError> for ErrorCode {
    fn from(err: &SmbError) -> Self {
        err.code()
    }
}

/// Message for a raw bridge error code
pub fn error_message(raw: i32) -> &'static str {
    ErrorCode::from_raw(raw).message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SmbError::NotFound("/videos/movie.mp4".to_string());
        assert_eq!(err.to_string(), "path not found: /videos/movie.mp4");

        let err = SmbError::StaleHandle {
            kind: "session",
            raw: 0x1_0000_0002,
        };
        assert_eq!(err.to_string(), "stale session handle: 0x100000002");
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(SmbError::NotConnected.code(), ErrorCode::Connection);
        assert_eq!(
            SmbError::Auth("bad password".into()).code(),
            ErrorCode::Authentication
        );
        assert_eq!(
            SmbError::StaleHandle { kind: "connection", raw: 7 }.code(),
            ErrorCode::FileNotFound
        );
        assert_eq!(
            SmbError::Unsupported("kerberos").code(),
            ErrorCode::Unknown
        );
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(SmbError::from(io).code(), ErrorCode::Connection);
    }

    #[test]
    fn test_raw_codes_roundtrip_through_messages() {
        assert_eq!(error_message(0), "Success");
        assert_eq!(error_message(-2), "Authentication failed");
        assert_eq!(error_message(-3), "File not found");
        assert_eq!(error_message(-7), "Thumbnail generation failed");
        assert_eq!(error_message(-999), "Unknown error");
        assert_eq!(error_message(42), "Unknown error");
        assert_eq!(ErrorCode::PermissionDenied.as_raw(), -4);
    }

    #[test]
    fn test_c_and_rust_messages_share_one_table() {
        for raw in [0, -1, -2, -3, -4, -5, -6, -7, -999] {
            let code = ErrorCode::from_raw(raw);
            assert_eq!(code.as_raw(), raw);
            assert_eq!(code.message_c_str().to_str().unwrap(), code.message());
        }
        assert_eq!(
            ErrorCode::MemoryAllocation.message_c_str(),
            c"Memory allocation failed"
        );
        assert_eq!(SmbError::MemoryAllocation.code(), ErrorCode::MemoryAllocation);
    }

    #[test]
    fn test_retryable() {
        assert!(SmbError::Connection("reset".into()).is_retryable());
        assert!(!SmbError::Auth("nope".into()).is_retryable());
        assert!(!SmbError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(SmbError::Auth("x".into()).is_permission_error());
        assert!(SmbError::Permission("x".into()).is_permission_error());
        assert!(SmbError::SessionClosed("x".into()).is_not_found());
        assert!(!SmbError::NotConnected.is_not_found());
    }
}

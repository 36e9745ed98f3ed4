//! NTSTATUS classification
//!
//! Maps the status codes an SMB2 server returns onto the client error
//! taxonomy. Only the codes that change how a caller reacts are named;
//! everything else falls back to a connection or protocol error.

use std::fmt;

use crate::error::SmbError;

/// A raw NTSTATUS code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtStatus(pub u32);

impl NtStatus {
    pub const SUCCESS: NtStatus = NtStatus(0x0000_0000);
    pub const NO_MORE_FILES: NtStatus = NtStatus(0x8000_0006);
    pub const INVALID_HANDLE: NtStatus = NtStatus(0xC000_0008);
    pub const INVALID_PARAMETER: NtStatus = NtStatus(0xC000_000D);
    pub const NO_SUCH_FILE: NtStatus = NtStatus(0xC000_000F);
    pub const END_OF_FILE: NtStatus = NtStatus(0xC000_0011);
    pub const ACCESS_DENIED: NtStatus = NtStatus(0xC000_0022);
    pub const OBJECT_NAME_INVALID: NtStatus = NtStatus(0xC000_0033);
    pub const OBJECT_NAME_NOT_FOUND: NtStatus = NtStatus(0xC000_0034);
    pub const OBJECT_PATH_NOT_FOUND: NtStatus = NtStatus(0xC000_003A);
    pub const SHARING_VIOLATION: NtStatus = NtStatus(0xC000_0043);
    pub const DELETE_PENDING: NtStatus = NtStatus(0xC000_0056);
    pub const WRONG_PASSWORD: NtStatus = NtStatus(0xC000_006A);
    pub const LOGON_FAILURE: NtStatus = NtStatus(0xC000_006D);
    pub const ACCOUNT_RESTRICTION: NtStatus = NtStatus(0xC000_006E);
    pub const PASSWORD_EXPIRED: NtStatus = NtStatus(0xC000_0071);
    pub const ACCOUNT_DISABLED: NtStatus = NtStatus(0xC000_0072);
    pub const FILE_IS_A_DIRECTORY: NtStatus = NtStatus(0xC000_00BA);
    pub const BAD_NETWORK_PATH: NtStatus = NtStatus(0xC000_00BE);
    pub const NETWORK_ACCESS_DENIED: NtStatus = NtStatus(0xC000_00CA);
    pub const BAD_NETWORK_NAME: NtStatus = NtStatus(0xC000_00CC);
    pub const NOT_A_DIRECTORY: NtStatus = NtStatus(0xC000_0103);
    pub const CONNECTION_DISCONNECTED: NtStatus = NtStatus(0xC000_020C);
    pub const CONNECTION_RESET: NtStatus = NtStatus(0xC000_020D);
    pub const ACCOUNT_LOCKED_OUT: NtStatus = NtStatus(0xC000_0234);
    pub const NETWORK_SESSION_EXPIRED: NtStatus = NtStatus(0xC000_035C);
    pub const USER_SESSION_DELETED: NtStatus = NtStatus(0xC000_0203);

    const SEVERITY_MASK: u32 = 0xC000_0000;

    pub fn is_error(self) -> bool {
        (self.0 & Self::SEVERITY_MASK) == 0xC000_0000
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "STATUS_SUCCESS",
            Self::NO_MORE_FILES => "STATUS_NO_MORE_FILES",
            Self::INVALID_HANDLE => "STATUS_INVALID_HANDLE",
            Self::INVALID_PARAMETER => "STATUS_INVALID_PARAMETER",
            Self::NO_SUCH_FILE => "STATUS_NO_SUCH_FILE",
            Self::END_OF_FILE => "STATUS_END_OF_FILE",
            Self::ACCESS_DENIED => "STATUS_ACCESS_DENIED",
            Self::OBJECT_NAME_INVALID => "STATUS_OBJECT_NAME_INVALID",
            Self::OBJECT_NAME_NOT_FOUND => "STATUS_OBJECT_NAME_NOT_FOUND",
            Self::OBJECT_PATH_NOT_FOUND => "STATUS_OBJECT_PATH_NOT_FOUND",
            Self::SHARING_VIOLATION => "STATUS_SHARING_VIOLATION",
            Self::DELETE_PENDING => "STATUS_DELETE_PENDING",
            Self::WRONG_PASSWORD => "STATUS_WRONG_PASSWORD",
            Self::LOGON_FAILURE => "STATUS_LOGON_FAILURE",
            Self::ACCOUNT_RESTRICTION => "STATUS_ACCOUNT_RESTRICTION",
            Self::PASSWORD_EXPIRED => "STATUS_PASSWORD_EXPIRED",
            Self::ACCOUNT_DISABLED => "STATUS_ACCOUNT_DISABLED",
            Self::FILE_IS_A_DIRECTORY => "STATUS_FILE_IS_A_DIRECTORY",
            Self::BAD_NETWORK_PATH => "STATUS_BAD_NETWORK_PATH",
            Self::NETWORK_ACCESS_DENIED => "STATUS_NETWORK_ACCESS_DENIED",
            Self::BAD_NETWORK_NAME => "STATUS_BAD_NETWORK_NAME",
            Self::NOT_A_DIRECTORY => "STATUS_NOT_A_DIRECTORY",
            Self::CONNECTION_DISCONNECTED => "STATUS_CONNECTION_DISCONNECTED",
            Self::CONNECTION_RESET => "STATUS_CONNECTION_RESET",
            Self::ACCOUNT_LOCKED_OUT => "STATUS_ACCOUNT_LOCKED_OUT",
            Self::NETWORK_SESSION_EXPIRED => "STATUS_NETWORK_SESSION_EXPIRED",
            Self::USER_SESSION_DELETED => "STATUS_USER_SESSION_DELETED",
            _ => return None,
        };
        Some(name)
    }

    /// Translate into the client taxonomy; `context` names the path or
    /// target the failing request was about
    pub fn into_error(self, context: &str) -> SmbError {
        let detail = format!("{} ({})", context, self);
        match self {
            Self::LOGON_FAILURE
            | Self::WRONG_PASSWORD
            | Self::ACCOUNT_RESTRICTION
            | Self::PASSWORD_EXPIRED
            | Self::ACCOUNT_DISABLED
            | Self::ACCOUNT_LOCKED_OUT => SmbError::Auth(detail),
            Self::ACCESS_DENIED | Self::NETWORK_ACCESS_DENIED | Self::SHARING_VIOLATION => {
                SmbError::Permission(detail)
            }
            Self::NO_SUCH_FILE
            | Self::OBJECT_NAME_NOT_FOUND
            | Self::OBJECT_PATH_NOT_FOUND
            | Self::DELETE_PENDING => SmbError::NotFound(detail),
            Self::OBJECT_NAME_INVALID
            | Self::INVALID_PARAMETER
            | Self::FILE_IS_A_DIRECTORY
            | Self::NOT_A_DIRECTORY => SmbError::InvalidParameter(detail),
            Self::BAD_NETWORK_NAME
            | Self::BAD_NETWORK_PATH
            | Self::CONNECTION_DISCONNECTED
            | Self::CONNECTION_RESET
            | Self::NETWORK_SESSION_EXPIRED
            | Self::USER_SESSION_DELETED => SmbError::Connection(detail),
            // An unnamed failure status is a failed exchange, never a bad entry
            _ => SmbError::Connection(detail),
        }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#010X})", name, self.0),
            None => write!(f, "{:#010X}", self.0),
        }
    }
}

impl From<u32> for NtStatus {
    fn from(code: u32) -> Self {
        NtStatus(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            NtStatus::LOGON_FAILURE.to_string(),
            "STATUS_LOGON_FAILURE (0xC000006D)"
        );
        assert_eq!(NtStatus(0xC0DE_0001).to_string(), "0xC0DE0001");
    }

    #[test]
    fn test_severity() {
        assert!(NtStatus::ACCESS_DENIED.is_error());
        assert!(!NtStatus::NO_MORE_FILES.is_error());
        assert!(!NtStatus::SUCCESS.is_error());
    }

    #[test]
    fn test_classification() {
        assert!(matches!(
            NtStatus::LOGON_FAILURE.into_error("alice"),
            SmbError::Auth(_)
        ));
        assert!(matches!(
            NtStatus::OBJECT_NAME_NOT_FOUND.into_error("/x"),
            SmbError::NotFound(_)
        ));
        assert!(matches!(
            NtStatus::SHARING_VIOLATION.into_error("/x"),
            SmbError::Permission(_)
        ));
        assert!(matches!(
            NtStatus::BAD_NETWORK_NAME.into_error("share"),
            SmbError::Connection(_)
        ));
    }

    #[test]
    fn test_unnamed_status_is_a_connection_failure() {
        for status in [NtStatus(0xC000_9999), NtStatus::INVALID_HANDLE, NtStatus(0xC000_00B5)] {
            let err = status.into_error("/videos");
            assert!(matches!(err, SmbError::Connection(_)), "{}", err);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_detail_carries_context_and_name() {
        let err = NtStatus::ACCESS_DENIED.into_error("/private/a.mkv");
        let text = err.to_string();
        assert!(text.contains("/private/a.mkv"));
        assert!(text.contains("STATUS_ACCESS_DENIED"));
    }
}

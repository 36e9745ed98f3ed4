//! Directory listing

use serde::Serialize;

use crate::connection::Connection;
use crate::error::{Result, SmbError};
use crate::transport::{normalize_path, RemoteDir};

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Full share path, `/`-separated
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: u64,
    pub is_directory: bool,
}

/// Closes the remote directory however enumeration ends
struct DirGuard(Box<dyn RemoteDir>);

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            tracing::warn!("Failed to close directory handle: {}", e);
        }
    }
}

/// List the direct children of `path`
///
/// Entries come back in server enumeration order. Malformed entries are
/// skipped; any other error aborts the listing. `.` and `..` are dropped.
pub fn list_directory(connection: &mut Connection, path: &str) -> Result<Vec<DirectoryEntry>> {
    let key = normalize_path(path)?;
    let mut dir = DirGuard(connection.open_dir(&key)?);
    let prefix = if key.is_empty() {
        String::new()
    } else {
        format!("/{}", key)
    };

    let mut entries = Vec::new();
    while let Some(next) = dir.0.next_entry() {
        let raw = match next {
            Ok(raw) => raw,
            Err(SmbError::Protocol(detail)) => {
                tracing::warn!("Skipping directory entry in /{}: {}", key, detail);
                continue;
            }
            Err(e) => {
                tracing::error!("Listing /{} failed: {}", key, e);
                return Err(e);
            }
        };
        if raw.name == "." || raw.name == ".." {
            continue;
        }
        entries.push(DirectoryEntry {
            path: format!("{}/{}", prefix, raw.name),
            name: raw.name,
            size: raw.stat.size,
            modified: raw.stat.modified,
            is_directory: raw.stat.is_directory,
        });
    }

    tracing::debug!("Listed {} entries in /{}", entries.len(), key);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryShare;
    use crate::transport::ntstatus::NtStatus;
    use crate::transport::{Credentials, ShareTarget};

    fn connect(share: &MemoryShare) -> Connection {
        let target = ShareTarget::new("fileserver", "share1", Credentials::default());
        Connection::connect(share, target).unwrap()
    }

    #[test]
    fn test_empty_directory_is_success() {
        let share = MemoryShare::new("fileserver", "share1");
        share.add_dir("/empty");
        let mut conn = connect(&share);
        assert!(list_directory(&mut conn, "/empty").unwrap().is_empty());
        assert_eq!(share.open_dir_handles(), 0);
    }

    #[test]
    fn test_entries_and_paths() {
        let share = MemoryShare::new("fileserver", "share1");
        share.add_file_with_mtime("/videos/a.mp4", vec![0; 10], 1_700_000_000);
        share.add_dir("/videos/season1");
        let mut conn = connect(&share);

        let entries = list_directory(&mut conn, "videos/").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.mp4");
        assert_eq!(entries[0].path, "/videos/a.mp4");
        assert_eq!(entries[0].size, 10);
        assert_eq!(entries[0].modified, 1_700_000_000);
        assert!(!entries[0].is_directory);
        assert_eq!(entries[1].path, "/videos/season1");
        assert!(entries[1].is_directory);

        let root = list_directory(&mut conn, "/").unwrap();
        assert_eq!(root[0].path, "/videos");
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let share = MemoryShare::new("fileserver", "share1");
        share.add_file("/d/a.bin", vec![1]);
        share.add_corrupt_entry("/d/b.bin");
        share.add_file("/d/c.bin", vec![1]);
        let mut conn = connect(&share);
        let names: Vec<String> = list_directory(&mut conn, "/d")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.bin", "c.bin"]);
    }

    #[test]
    fn test_interrupted_listing_still_closes_handle() {
        let share = MemoryShare::new("fileserver", "share1");
        for i in 0..5 {
            share.add_file(&format!("/d/{}.bin", i), vec![0]);
        }
        share.fail_listing_after("/d", 4);
        let mut conn = connect(&share);
        let err = list_directory(&mut conn, "/d").unwrap_err();
        assert!(matches!(err, SmbError::Connection(_)));
        assert_eq!(share.open_dir_handles(), 0);
    }

    #[test]
    fn test_unrecognised_status_mid_listing_aborts() {
        let share = MemoryShare::new("fileserver", "share1");
        for i in 0..5 {
            share.add_file(&format!("/d/{}.bin", i), vec![0]);
        }
        share.fail_listing_with("/d", 3, NtStatus(0xC000_9999));
        let mut conn = connect(&share);
        let err = list_directory(&mut conn, "/d").unwrap_err();
        assert!(matches!(err, SmbError::Connection(_)));
        assert_eq!(share.open_dir_handles(), 0);
    }

    #[test]
    fn test_listing_a_file_or_missing_path_fails() {
        let share = MemoryShare::new("fileserver", "share1");
        share.add_file("/a.bin", vec![0]);
        let mut conn = connect(&share);
        assert!(list_directory(&mut conn, "/a.bin").is_err());
        assert!(matches!(
            list_directory(&mut conn, "/missing").unwrap_err(),
            SmbError::NotFound(_)
        ));
        assert_eq!(share.open_dir_handles(), 0);
    }
}

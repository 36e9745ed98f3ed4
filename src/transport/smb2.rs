//! Native SMB2/3 transport using the smb crate
//!
//! The `smb` crate is async; every call here is driven to completion on a
//! shared multi-threaded tokio runtime so the rest of the client stays
//! blocking. Do not call into this transport from inside a tokio runtime.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use smb::{
    Client, ClientConfig, Directory, FileAccessMask, FileBasicInformation, FileCreateArgs,
    FileDirectoryInformation, Resource, UncPath,
};
use tokio::runtime::{Builder, Runtime};

use super::ntstatus::NtStatus;
use super::{
    Connector, Dialect, RemoteDir, RemoteDirEntry, RemoteFile, RemoteStat, ShareTarget,
    ShareTransport,
};
use crate::error::{Result, SmbError};

/// Map an smb crate error, using the server status when there is one
fn map_err(context: &str, err: smb::Error) -> SmbError {
    match err {
        smb::Error::ReceivedErrorMessage(status, _) => NtStatus(status).into_error(context),
        other => SmbError::Connection(format!("{}: {}", context, other)),
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Last-write time from a basic-info query; 0 when the server refuses it
fn modified_seconds(
    info: std::result::Result<FileBasicInformation, smb::Error>,
    path: &str,
) -> u64 {
    match info {
        Ok(info) => unix_seconds(SystemTime::from(info.last_write_time)),
        Err(e) => {
            tracing::debug!("No basic information for /{}: {}", path, e);
            0
        }
    }
}

/// Connector for real SMB2/3 servers
pub struct Smb2Connector {
    runtime: Arc<Runtime>,
}

impl Smb2Connector {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("smbstream-io")
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Connector for Smb2Connector {
    fn name(&self) -> &str {
        "smb2"
    }

    fn connect(&self, target: &ShareTarget) -> Result<Box<dyn ShareTransport>> {
        target.validate()?;
        tracing::info!("Creating SMB client for {}\\{}", target.server, target.share);

        let share_unc = format!(r"\\{}\{}", target.server, target.share);
        let share_path = UncPath::from_str(&share_unc)
            .map_err(|_| SmbError::InvalidParameter(share_unc.clone()))?;

        let client = Client::new(ClientConfig::default());
        let username = target.credentials.qualified_username();
        let password = target.credentials.password.expose().to_string();

        let dialect = self.runtime.block_on(async {
            client
                .share_connect(&share_path, &username, password)
                .await
                .map_err(|e| {
                    tracing::error!("SMB connection failed: {:?}", e);
                    map_err(&share_unc, e)
                })?;
            let connection = client
                .get_connection(&target.server)
                .await
                .map_err(|e| map_err(&target.server, e))?;
            let revision = format!("{:?}", connection.conn_info().negotiation.dialect_rev);
            Ok::<_, SmbError>(dialect_from_name(&revision))
        })?;

        tracing::info!(
            "Connected to {}\\{} ({})",
            target.server,
            target.share,
            dialect
        );
        Ok(Box::new(Smb2Transport {
            runtime: self.runtime.clone(),
            client: Some(Arc::new(client)),
            share_path,
            dialect,
        }))
    }
}

/// Dialect from the smb crate's revision name, e.g. `Smb0311`
fn dialect_from_name(name: &str) -> Dialect {
    match name {
        "Smb0202" => Dialect::Smb202,
        "Smb021" | "Smb0210" => Dialect::Smb210,
        "Smb030" | "Smb0300" => Dialect::Smb300,
        "Smb0302" => Dialect::Smb302,
        "Smb0311" => Dialect::Smb311,
        _ => Dialect::Other,
    }
}

struct Smb2Transport {
    runtime: Arc<Runtime>,
    client: Option<Arc<Client>>,
    share_path: UncPath,
    dialect: Dialect,
}

impl Smb2Transport {
    fn client(&self) -> Result<Arc<Client>> {
        self.client.clone().ok_or(SmbError::NotConnected)
    }

    fn unc(&self, path: &str) -> UncPath {
        self.share_path.clone().with_path(&path.replace('/', "\\"))
    }

    fn open(&self, path: &str) -> Result<Resource> {
        let client = self.client()?;
        let unc = self.unc(path);
        let args = FileCreateArgs::make_open_existing(FileAccessMask::new().with_generic_read(true));
        self.runtime
            .block_on(client.create_file(&unc, &args))
            .map_err(|e| map_err(&format!("/{}", path), e))
    }
}

impl ShareTransport for Smb2Transport {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn RemoteFile>> {
        match self.open(path)? {
            Resource::File(file) => Ok(Box::new(Smb2File {
                runtime: self.runtime.clone(),
                file: Some(file),
                path: path.to_string(),
                position: 0,
            })),
            Resource::Directory(dir) => {
                self.runtime.block_on(dir.close()).ok();
                Err(NtStatus::FILE_IS_A_DIRECTORY.into_error(&format!("/{}", path)))
            }
            Resource::Pipe(pipe) => {
                self.runtime.block_on(pipe.close()).ok();
                Err(SmbError::InvalidParameter(format!("/{} is a pipe", path)))
            }
        }
    }

    fn open_dir(&mut self, path: &str) -> Result<Box<dyn RemoteDir>> {
        let dir = match self.open(path)? {
            Resource::Directory(dir) => Arc::new(dir),
            Resource::File(file) => {
                self.runtime.block_on(file.close()).ok();
                return Err(NtStatus::NOT_A_DIRECTORY.into_error(&format!("/{}", path)));
            }
            Resource::Pipe(pipe) => {
                self.runtime.block_on(pipe.close()).ok();
                return Err(SmbError::InvalidParameter(format!("/{} is a pipe", path)));
            }
        };

        // The query stream borrows the directory, so entries are drained here
        // and handed out one at a time.
        let context = format!("/{}", path);
        let entries = self.runtime.block_on(async {
            let mut entries = Vec::new();
            let mut stream = match Directory::query::<FileDirectoryInformation>(&dir, "*").await {
                Ok(stream) => stream,
                Err(e) => {
                    entries.push(Err(map_err(&context, e)));
                    return entries;
                }
            };
            while let Some(item) = stream.next().await {
                entries.push(match item {
                    Ok(info) => Ok(RemoteDirEntry {
                        name: info.file_name.to_string(),
                        stat: RemoteStat {
                            size: info.end_of_file,
                            modified: unix_seconds(SystemTime::from(info.last_write_time)),
                            is_directory: info.file_attributes.directory(),
                        },
                    }),
                    Err(e) => Err(map_err(&context, e)),
                });
            }
            entries
        });

        Ok(Box::new(Smb2Dir {
            runtime: self.runtime.clone(),
            dir: Some(dir),
            entries: entries.into_iter(),
        }))
    }

    fn stat(&mut self, path: &str) -> Result<RemoteStat> {
        let resource = self.open(path)?;
        self.runtime.block_on(async {
            match resource {
                Resource::File(file) => {
                    let size = file.get_len().await;
                    let info = file.query_info::<FileBasicInformation>().await;
                    file.close().await.ok();
                    Ok(RemoteStat {
                        size: size.map_err(|e| map_err(&format!("/{}", path), e))?,
                        modified: modified_seconds(info, path),
                        is_directory: false,
                    })
                }
                Resource::Directory(dir) => {
                    let info = dir.query_info::<FileBasicInformation>().await;
                    dir.close().await.ok();
                    Ok(RemoteStat {
                        size: 0,
                        modified: modified_seconds(info, path),
                        is_directory: true,
                    })
                }
                Resource::Pipe(pipe) => {
                    pipe.close().await.ok();
                    Err(SmbError::InvalidParameter(format!("/{} is a pipe", path)))
                }
            }
        })
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            self.runtime
                .block_on(client.close())
                .map_err(|e| map_err("disconnect", e))?;
        }
        Ok(())
    }
}

struct Smb2File {
    runtime: Arc<Runtime>,
    file: Option<smb::File>,
    path: String,
    position: u64,
}

impl Smb2File {
    fn file(&self) -> Result<&smb::File> {
        self.file
            .as_ref()
            .ok_or_else(|| SmbError::SessionClosed(format!("/{}", self.path)))
    }
}

impl RemoteFile for Smb2File {
    // SMB2 READ carries its own offset, so seeking only moves the cursor.
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.file()?;
        self.position = offset;
        Ok(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file()?;
        match self
            .runtime
            .block_on(file.read_block(buf, self.position, None, false))
        {
            Ok(n) => {
                self.position += n as u64;
                Ok(n)
            }
            Err(smb::Error::ReceivedErrorMessage(status, _))
                if NtStatus(status) == NtStatus::END_OF_FILE =>
            {
                Ok(0)
            }
            Err(e) => Err(map_err(&format!("/{}", self.path), e)),
        }
    }

    fn size(&mut self) -> Result<u64> {
        let file = self.file()?;
        self.runtime
            .block_on(file.get_len())
            .map_err(|e| map_err(&format!("/{}", self.path), e))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            self.runtime
                .block_on(file.close())
                .map_err(|e| map_err(&format!("/{}", self.path), e))?;
        }
        Ok(())
    }
}

struct Smb2Dir {
    runtime: Arc<Runtime>,
    dir: Option<Arc<Directory>>,
    entries: std::vec::IntoIter<Result<RemoteDirEntry>>,
}

impl RemoteDir for Smb2Dir {
    fn next_entry(&mut self) -> Option<Result<RemoteDirEntry>> {
        self.dir.as_ref()?;
        self.entries.next()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            self.runtime
                .block_on(dir.close())
                .map_err(|e| map_err("directory", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Credentials;

    #[test]
    fn test_dialect_from_revision_name() {
        assert_eq!(dialect_from_name("Smb0311"), Dialect::Smb311);
        assert_eq!(dialect_from_name("Smb021"), Dialect::Smb210);
        assert_eq!(dialect_from_name("Smb0202"), Dialect::Smb202);
        assert_eq!(dialect_from_name("Wildcard"), Dialect::Other);
    }

    fn live_target() -> Option<ShareTarget> {
        let server = std::env::var("SMBSTREAM_TEST_SERVER").ok()?;
        let share = std::env::var("SMBSTREAM_TEST_SHARE").ok()?;
        let user = std::env::var("SMBSTREAM_TEST_USER").unwrap_or_default();
        let pass = std::env::var("SMBSTREAM_TEST_PASS").unwrap_or_default();
        Some(ShareTarget::new(server, share, Credentials::new(user, pass)))
    }

    #[test]
    #[ignore] // Requires SMBSTREAM_TEST_SERVER and SMBSTREAM_TEST_SHARE
    fn test_live_connect_and_list_root() {
        let target = live_target().expect("SMBSTREAM_TEST_* not set");
        let connector = Smb2Connector::new().unwrap();
        let mut transport = connector.connect(&target).unwrap();
        assert_ne!(transport.dialect().name(), "");
        let mut dir = transport.open_dir("").unwrap();
        while let Some(entry) = dir.next_entry() {
            let _ = entry;
        }
        dir.close().unwrap();
        transport.disconnect().unwrap();
    }

    #[test]
    #[ignore] // Requires SMBSTREAM_TEST_SERVER and SMBSTREAM_TEST_SHARE
    fn test_live_missing_file_is_not_found() {
        let target = live_target().expect("SMBSTREAM_TEST_* not set");
        let connector = Smb2Connector::new().unwrap();
        let mut transport = connector.connect(&target).unwrap();
        let err = transport.open_read("smbstream-missing-file.bin").err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    #[ignore] // Requires SMBSTREAM_TEST_SERVER and SMBSTREAM_TEST_SHARE
    fn test_live_stat_reports_last_write_time() {
        let target = live_target().expect("SMBSTREAM_TEST_* not set");
        let connector = Smb2Connector::new().unwrap();
        let mut transport = connector.connect(&target).unwrap();
        let root = transport.stat("").unwrap();
        assert!(root.is_directory);
        assert!(root.modified > 0);
        transport.disconnect().unwrap();
    }
}

//! In-memory share
//!
//! Implements the transport traits over a map of paths held in memory, so the
//! registry, sessions and bridge can be exercised without a server. It can
//! also inject the failures a real share produces: rejected credentials,
//! missing shares, denied paths, short reads, dropped links and malformed
//! directory entries. Handle counters let tests assert that every remote
//! handle is released exactly once.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ntstatus::NtStatus;
use super::{
    normalize_path, Connector, Dialect, RemoteDir, RemoteDirEntry, RemoteFile, RemoteStat,
    ShareTarget, ShareTransport,
};
use crate::error::{Result, SmbError};

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Arc<Vec<u8>>,
        modified: u64,
        denied: bool,
    },
    Dir {
        modified: u64,
        denied: bool,
    },
    /// Listed but unreadable; enumeration yields a malformed entry
    Corrupt,
}

impl Node {
    fn stat(&self) -> RemoteStat {
        match self {
            Node::File { data, modified, .. } => RemoteStat {
                size: data.len() as u64,
                modified: *modified,
                is_directory: false,
            },
            Node::Dir { modified, .. } => RemoteStat {
                size: 0,
                modified: *modified,
                is_directory: true,
            },
            Node::Corrupt => RemoteStat::default(),
        }
    }

    fn denied(&self) -> bool {
        matches!(
            self,
            Node::File { denied: true, .. } | Node::Dir { denied: true, .. }
        )
    }
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<String, Node>,
    credentials: Option<(String, String)>,
    domain: Option<String>,
    dialect: Dialect,
    offline: bool,
    max_read_size: Option<usize>,
    fail_listing_after: BTreeMap<String, (usize, NtStatus)>,
}

/// Counters observed by tests
#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    files_opened: AtomicUsize,
    files_closed: AtomicUsize,
    dirs_opened: AtomicUsize,
    dirs_closed: AtomicUsize,
    stat_calls: AtomicUsize,
    seeks: AtomicUsize,
}

#[derive(Debug)]
struct Inner {
    server: String,
    share: String,
    state: RwLock<State>,
    counters: Counters,
}

/// In-memory share reachable as `smb://server/share`
///
/// Cloning is cheap; clones observe the same files and counters.
///
/// # Example
///
/// ```
/// use smbstream::transport::memory::MemoryShare;
///
/// let share = MemoryShare::new("fileserver", "share1")
///     .with_credentials("alice", "secret");
/// share.add_file("/videos/movie.mp4", vec![0u8; 4096]);
/// assert!(share.exists("videos"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryShare {
    inner: Arc<Inner>,
}

impl MemoryShare {
    /// Create an empty share that accepts any credentials
    pub fn new(server: impl Into<String>, share: impl Into<String>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::new(),
            Node::Dir {
                modified: 0,
                denied: false,
            },
        );
        Self {
            inner: Arc::new(Inner {
                server: server.into(),
                share: share.into(),
                state: RwLock::new(State {
                    nodes,
                    credentials: None,
                    domain: None,
                    dialect: Dialect::Smb311,
                    offline: false,
                    max_read_size: None,
                    fail_listing_after: BTreeMap::new(),
                }),
                counters: Counters::default(),
            }),
        }
    }

    /// Only accept this user/password pair
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        self.write().credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Additionally require this domain
    pub fn with_domain(self, domain: &str) -> Self {
        self.write().domain = Some(domain.to_string());
        self
    }

    pub fn with_dialect(self, dialect: Dialect) -> Self {
        self.write().dialect = dialect;
        self
    }

    /// Cap every read at `max` bytes, like a server's MaxReadSize
    pub fn with_max_read_size(self, max: usize) -> Self {
        self.write().max_read_size = Some(max.max(1));
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: &str, node: Node) {
        let Ok(path) = normalize_path(path) else {
            return;
        };
        let mut state = self.write();
        let mut parent = String::new();
        let components: Vec<&str> = path.split('/').collect();
        for component in &components[..components.len().saturating_sub(1)] {
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(component);
            state.nodes.entry(parent.clone()).or_insert(Node::Dir {
                modified: 0,
                denied: false,
            });
        }
        state.nodes.insert(path, node);
    }

    /// Add a file, creating parent directories as needed
    pub fn add_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.add_file_with_mtime(path, data, 0);
    }

    pub fn add_file_with_mtime(&self, path: &str, data: impl Into<Vec<u8>>, modified: u64) {
        self.insert(
            path,
            Node::File {
                data: Arc::new(data.into()),
                modified,
                denied: false,
            },
        );
    }

    pub fn add_dir(&self, path: &str) {
        self.insert(
            path,
            Node::Dir {
                modified: 0,
                denied: false,
            },
        );
    }

    /// Add an entry that enumerates as malformed
    pub fn add_corrupt_entry(&self, path: &str) {
        self.insert(path, Node::Corrupt);
    }

    /// Deny access to an existing path
    pub fn deny(&self, path: &str) {
        let Ok(path) = normalize_path(path) else {
            return;
        };
        if let Some(node) = self.write().nodes.get_mut(&path) {
            match node {
                Node::File { denied, .. } | Node::Dir { denied, .. } => *denied = true,
                Node::Corrupt => {}
            }
        }
    }

    pub fn remove(&self, path: &str) {
        if let Ok(path) = normalize_path(path) {
            self.write().nodes.remove(&path);
        }
    }

    /// Break the link: new connects and every remote call fail
    pub fn set_offline(&self, offline: bool) {
        self.write().offline = offline;
    }

    /// Fail the enumeration of `dir` after `entries` entries
    pub fn fail_listing_after(&self, dir: &str, entries: usize) {
        self.fail_listing_with(dir, entries, NtStatus::CONNECTION_RESET);
    }

    /// Fail the enumeration of `dir` with `status` after `entries` entries
    pub fn fail_listing_with(&self, dir: &str, entries: usize, status: NtStatus) {
        if let Ok(dir) = normalize_path(dir) {
            self.write().fail_listing_after.insert(dir, (entries, status));
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|p| self.read().nodes.contains_key(&p))
            .unwrap_or(false)
    }

    pub fn connects(&self) -> usize {
        self.inner.counters.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.inner.counters.disconnects.load(Ordering::SeqCst)
    }

    pub fn files_opened(&self) -> usize {
        self.inner.counters.files_opened.load(Ordering::SeqCst)
    }

    pub fn files_closed(&self) -> usize {
        self.inner.counters.files_closed.load(Ordering::SeqCst)
    }

    /// Remote file handles opened and not yet closed
    pub fn open_file_handles(&self) -> usize {
        self.files_opened() - self.files_closed()
    }

    /// Remote directory handles opened and not yet closed
    pub fn open_dir_handles(&self) -> usize {
        self.inner.counters.dirs_opened.load(Ordering::SeqCst)
            - self.inner.counters.dirs_closed.load(Ordering::SeqCst)
    }

    pub fn stat_calls(&self) -> usize {
        self.inner.counters.stat_calls.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> usize {
        self.inner.counters.seeks.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.read().offline {
            return Err(NtStatus::CONNECTION_DISCONNECTED.into_error(&self.inner.server));
        }
        Ok(())
    }

    fn lookup(&self, path: &str) -> Result<Node> {
        let node = self
            .read()
            .nodes
            .get(path)
            .cloned()
            .ok_or_else(|| NtStatus::OBJECT_NAME_NOT_FOUND.into_error(&display(path)))?;
        if node.denied() {
            return Err(NtStatus::ACCESS_DENIED.into_error(&display(path)));
        }
        Ok(node)
    }
}

fn display(path: &str) -> String {
    format!("/{}", path)
}

impl Connector for MemoryShare {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect(&self, target: &ShareTarget) -> Result<Box<dyn ShareTransport>> {
        target.validate()?;
        let state = self.read();
        if state.offline || !target.server.eq_ignore_ascii_case(&self.inner.server) {
            return Err(SmbError::Connection(format!(
                "cannot reach {}",
                target.server
            )));
        }
        if !target.share.eq_ignore_ascii_case(&self.inner.share) {
            return Err(NtStatus::BAD_NETWORK_NAME.into_error(&target.share_url()));
        }
        if let Some((user, pass)) = &state.credentials {
            let creds = &target.credentials;
            if creds.username != *user || creds.password.expose() != pass {
                return Err(NtStatus::LOGON_FAILURE.into_error(&creds.username));
            }
        }
        if let Some(domain) = &state.domain {
            if !target.credentials.domain.eq_ignore_ascii_case(domain) {
                return Err(NtStatus::LOGON_FAILURE
                    .into_error(&target.credentials.qualified_username()));
            }
        }
        let dialect = state.dialect;
        drop(state);

        self.inner.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransport {
            share: self.clone(),
            dialect,
            connected: true,
        }))
    }
}

struct MemoryTransport {
    share: MemoryShare,
    dialect: Dialect,
    connected: bool,
}

impl MemoryTransport {
    fn ensure_connected(&self) -> Result<()> {
        if !self.connected {
            return Err(SmbError::NotConnected);
        }
        self.share.check_online()
    }
}

impl ShareTransport for MemoryTransport {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn RemoteFile>> {
        self.ensure_connected()?;
        match self.share.lookup(path)? {
            Node::File { data, .. } => {
                self.share
                    .inner
                    .counters
                    .files_opened
                    .fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MemoryFile {
                    share: self.share.clone(),
                    path: path.to_string(),
                    data,
                    position: 0,
                    closed: false,
                }))
            }
            Node::Dir { .. } => Err(NtStatus::FILE_IS_A_DIRECTORY.into_error(&display(path))),
            Node::Corrupt => Err(NtStatus::OBJECT_NAME_INVALID.into_error(&display(path))),
        }
    }

    fn open_dir(&mut self, path: &str) -> Result<Box<dyn RemoteDir>> {
        self.ensure_connected()?;
        match self.share.lookup(path)? {
            Node::Dir { .. } => {}
            _ => return Err(NtStatus::NOT_A_DIRECTORY.into_error(&display(path))),
        }

        let state = self.share.read();
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };
        let mut entries = vec![
            Ok(dot_entry(".")),
            Ok(dot_entry("..")),
        ];
        for (key, node) in state.nodes.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let name = &key[prefix.len()..];
            if name.is_empty() || name.contains('/') {
                continue;
            }
            entries.push(match node {
                Node::Corrupt => Err(SmbError::Protocol(format!(
                    "malformed directory entry {}",
                    display(key)
                ))),
                node => Ok(RemoteDirEntry {
                    name: name.to_string(),
                    stat: node.stat(),
                }),
            });
        }
        let fail_after = state.fail_listing_after.get(path).copied();
        drop(state);

        self.share
            .inner
            .counters
            .dirs_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryDir {
            share: self.share.clone(),
            entries: entries.into_iter(),
            yielded: 0,
            fail_after,
            closed: false,
        }))
    }

    fn stat(&mut self, path: &str) -> Result<RemoteStat> {
        self.ensure_connected()?;
        self.share
            .inner
            .counters
            .stat_calls
            .fetch_add(1, Ordering::SeqCst);
        Ok(self.share.lookup(path)?.stat())
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.connected = false;
            self.share
                .inner
                .counters
                .disconnects
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn dot_entry(name: &str) -> RemoteDirEntry {
    RemoteDirEntry {
        name: name.to_string(),
        stat: RemoteStat {
            size: 0,
            modified: 0,
            is_directory: true,
        },
    }
}

struct MemoryFile {
    share: MemoryShare,
    path: String,
    data: Arc<Vec<u8>>,
    position: u64,
    closed: bool,
}

impl MemoryFile {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(NtStatus::INVALID_HANDLE.into_error(&display(&self.path)));
        }
        self.share.check_online()
    }
}

impl RemoteFile for MemoryFile {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.ensure_open()?;
        self.share.inner.counters.seeks.fetch_add(1, Ordering::SeqCst);
        self.position = offset;
        Ok(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let len = self.data.len() as u64;
        if self.position >= len || buf.is_empty() {
            return Ok(0);
        }
        let mut want = buf.len().min((len - self.position) as usize);
        if let Some(max) = self.share.read().max_read_size {
            want = want.min(max);
        }
        let start = self.position as usize;
        buf[..want].copy_from_slice(&self.data[start..start + want]);
        self.position += want as u64;
        Ok(want)
    }

    fn size(&mut self) -> Result<u64> {
        self.ensure_open()?;
        self.share
            .inner
            .counters
            .stat_calls
            .fetch_add(1, Ordering::SeqCst);
        Ok(self.data.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.share
                .inner
                .counters
                .files_closed
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct MemoryDir {
    share: MemoryShare,
    entries: std::vec::IntoIter<Result<RemoteDirEntry>>,
    yielded: usize,
    fail_after: Option<(usize, NtStatus)>,
    closed: bool,
}

impl RemoteDir for MemoryDir {
    fn next_entry(&mut self) -> Option<Result<RemoteDirEntry>> {
        if self.closed {
            return None;
        }
        if let Err(e) = self.share.check_online() {
            return Some(Err(e));
        }
        if let Some((limit, status)) = self.fail_after {
            if self.yielded >= limit {
                return Some(Err(status.into_error("directory enumeration")));
            }
        }
        let next = self.entries.next()?;
        self.yielded += 1;
        Some(next)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.share
                .inner
                .counters
                .dirs_closed
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

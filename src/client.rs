//! Client service
//!
//! [`SmbClient`] composes one [`HandleRegistry`] with one [`Connector`] and
//! exposes every operation by handle id. Each instance is independent, so
//! tests can run many side by side; the C bridge owns one process-wide
//! instance.

use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use crate::config::{ClientConfig, StreamingOptions};
use crate::connection::Connection;
use crate::directory::{self, DirectoryEntry};
use crate::error::{Result, SmbError};
use crate::registry::{lock, ConnectionId, HandleRegistry, SessionId};
use crate::session::FileSession;
use crate::transport::{Connector, Credentials, ShareTarget};

/// Point-in-time view of a file session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub owner: ConnectionId,
    pub path: String,
    pub offset: u64,
    pub size: Option<u64>,
    pub read_ahead: usize,
    pub options: StreamingOptions,
    pub open: bool,
}

/// Handle-based SMB client
pub struct SmbClient {
    connector: RwLock<Arc<dyn Connector>>,
    config: ClientConfig,
    registry: HandleRegistry,
}

impl SmbClient {
    pub fn new(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        Self {
            connector: RwLock::new(connector),
            config,
            registry: HandleRegistry::new(),
        }
    }

    /// Client with default configuration
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self::new(Arc::new(connector), ClientConfig::default())
    }

    /// Client speaking real SMB2/3
    #[cfg(feature = "smb-native")]
    pub fn native(config: ClientConfig) -> Result<Self> {
        let connector = crate::transport::smb2::Smb2Connector::new()?;
        Ok(Self::new(Arc::new(connector), config))
    }

    /// Swap the connector used by later connects; live connections keep theirs
    pub fn set_connector(&self, connector: Arc<dyn Connector>) {
        *self
            .connector
            .write()
            .unwrap_or_else(PoisonError::into_inner) = connector;
    }

    fn connector(&self) -> Arc<dyn Connector> {
        self.connector
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Connect using the configured default domain
    pub fn connect(
        &self,
        server: &str,
        share: &str,
        username: &str,
        password: &str,
    ) -> Result<ConnectionId> {
        let domain = self.config.default_domain.clone();
        self.connect_with_domain(server, share, username, password, &domain)
    }

    pub fn connect_with_domain(
        &self,
        server: &str,
        share: &str,
        username: &str,
        password: &str,
        domain: &str,
    ) -> Result<ConnectionId> {
        let credentials = Credentials::new(username, password).with_domain(domain);
        let target = ShareTarget::new(server, share, credentials);
        let connection = Connection::connect(self.connector().as_ref(), target)?;
        let (id, _) = self.registry.register_connection(connection);
        tracing::debug!("Registered {:?}", id);
        Ok(id)
    }

    /// Close every session of the connection, then the connection itself
    ///
    /// Unknown or already-disconnected ids are a no-op.
    pub fn disconnect(&self, id: ConnectionId) -> Result<()> {
        let Some(shared) = self.registry.unregister_connection(id) else {
            tracing::debug!("Disconnect on stale {:?} ignored", id);
            return Ok(());
        };
        let mut connection = lock(&shared);
        for (session_id, session) in self.registry.unregister_sessions_of(id) {
            if let Err(e) = lock(&session).close() {
                tracing::warn!("Closing {:?} during disconnect failed: {}", session_id, e);
            }
        }
        connection.disconnect()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.registry
            .resolve_connection(id)
            .map(|shared| lock(&shared).is_connected())
            .unwrap_or(false)
    }

    fn with_connection<R>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut Connection) -> Result<R>,
    ) -> Result<R> {
        let shared = self.registry.resolve_connection(id).map_err(|e| {
            tracing::warn!("{}", e);
            e
        })?;
        let mut connection = lock(&shared);
        f(&mut connection)
    }

    pub fn version(&self, id: ConnectionId) -> Result<String> {
        self.with_connection(id, |c| Ok(c.version()))
    }

    pub fn connection_info(&self, id: ConnectionId) -> Result<String> {
        self.with_connection(id, |c| Ok(c.connection_info()))
    }

    pub fn connection_url(&self, id: ConnectionId) -> Result<String> {
        self.with_connection(id, |c| Ok(c.connection_url()))
    }

    pub fn generate_direct_url(&self, id: ConnectionId, path: &str) -> Result<String> {
        self.with_connection(id, |c| Ok(c.generate_direct_url(path)))
    }

    pub fn generate_url_with_credentials(
        &self,
        id: ConnectionId,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<String> {
        self.with_connection(id, |c| {
            Ok(c.generate_url_with_credentials(path, username, password))
        })
    }

    pub fn file_exists(&self, id: ConnectionId, path: &str) -> Result<bool> {
        self.with_connection(id, |c| c.file_exists(path))
    }

    pub fn directory_exists(&self, id: ConnectionId, path: &str) -> Result<bool> {
        self.with_connection(id, |c| c.directory_exists(path))
    }

    pub fn list_directory(&self, id: ConnectionId, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.with_connection(id, |c| directory::list_directory(c, path))
    }

    pub fn open_file(&self, id: ConnectionId, path: &str) -> Result<SessionId> {
        let read_ahead = self.config.default_read_ahead;
        self.open_session(id, |c, options| c.open_file(path, options), read_ahead)
    }

    /// Open with the streaming read-ahead preset
    pub fn open_for_streaming(&self, id: ConnectionId, path: &str) -> Result<SessionId> {
        let read_ahead = self.config.streaming_read_ahead;
        self.open_session(
            id,
            |c, options| c.open_for_streaming(path, options, read_ahead),
            read_ahead,
        )
    }

    // The session is registered while the connection lock is held, so a
    // concurrent disconnect either sees it or runs before the open.
    fn open_session(
        &self,
        id: ConnectionId,
        open: impl FnOnce(&mut Connection, StreamingOptions) -> Result<FileSession>,
        read_ahead: usize,
    ) -> Result<SessionId> {
        let options = self.config.streaming;
        self.with_connection(id, |c| {
            let mut session = open(c, options)?;
            session.read_ahead = read_ahead;
            let session_id = self.registry.register_session(id, session);
            tracing::debug!("Registered {:?} under {:?}", session_id, id);
            Ok(session_id)
        })
    }

    /// Close a session; unknown or already-closed ids are a no-op
    pub fn close_file(&self, id: SessionId) -> Result<()> {
        match self.registry.unregister_session(id) {
            Some(session) => lock(&session).close(),
            None => {
                tracing::debug!("Close on stale {:?} ignored", id);
                Ok(())
            }
        }
    }

    /// Run `f` with exclusive access to a session
    pub fn with_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut FileSession) -> Result<R>,
    ) -> Result<R> {
        let shared = self.registry.resolve_session(id).map_err(|e| {
            tracing::warn!("{}", e);
            e
        })?;
        let mut session = lock(&shared);
        f(&mut session)
    }

    pub fn read(&self, id: SessionId, buf: &mut [u8]) -> Result<usize> {
        self.with_session(id, |s| s.read(buf))
    }

    pub fn seek(&self, id: SessionId, offset: u64) -> Result<()> {
        self.with_session(id, |s| s.seek(offset))
    }

    pub fn file_size(&self, id: SessionId) -> Result<u64> {
        self.with_session(id, |s| s.size())
    }

    pub fn read_optimized(&self, id: SessionId, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.with_session(id, |s| s.read_optimized(buf, offset))
    }

    pub fn read_range(&self, id: SessionId, buf: &mut [u8], start: u64, end: u64) -> Result<usize> {
        self.with_session(id, |s| s.read_range(buf, start, end))
    }

    pub fn read_range_async(
        &self,
        id: SessionId,
        buf: &mut [u8],
        start: u64,
        end: u64,
    ) -> Result<usize> {
        self.with_session(id, |s| s.read_range_async(buf, start, end))
    }

    pub fn read_exact_range(&self, id: SessionId, start: u64, end: u64) -> Result<Bytes> {
        self.with_session(id, |s| s.read_exact_range(start, end))
    }

    pub fn prefetch_range(&self, id: SessionId, start: u64, end: u64) -> Result<()> {
        self.with_session(id, |s| s.prefetch_range(start, end))
    }

    pub fn set_read_ahead(&self, id: SessionId, size: usize) -> Result<()> {
        self.with_session(id, |s| s.set_read_ahead(size))
    }

    pub fn set_streaming_options(&self, id: SessionId, options: StreamingOptions) -> Result<()> {
        self.with_session(id, |s| s.set_streaming_options(options))
    }

    pub fn session_info(&self, id: SessionId) -> Result<SessionInfo> {
        let owner = self.registry.session_owner(id)?;
        self.with_session(id, |s| {
            Ok(SessionInfo {
                id,
                owner,
                path: s.path().to_string(),
                offset: s.offset(),
                size: s.cached_size(),
                read_ahead: s.read_ahead(),
                options: s.streaming_options(),
                open: s.is_open(),
            })
        })
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }
}

impl std::fmt::Debug for SmbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbClient")
            .field("connector", &self.connector().name().to_string())
            .field("connections", &self.connection_count())
            .field("sessions", &self.session_count())
            .finish()
    }
}

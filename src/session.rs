//! File sessions
//!
//! A [`FileSession`] is one open remote file under a connection. It owns the
//! remote handle and tracks the offset the remote protocol will read from
//! next. The ranged and chunked reads live in [`crate::streaming`].

use std::fmt;

use crate::config::StreamingOptions;
use crate::error::{Result, SmbError};
use crate::transport::RemoteFile;

/// Lifecycle of a file session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Open => write!(f, "open"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// One open remote file
pub struct FileSession {
    path: String,
    file: Box<dyn RemoteFile>,
    state: SessionState,
    /// Where the next sequential read starts
    offset: u64,
    size: Option<u64>,
    pub(crate) read_ahead: usize,
    pub(crate) options: StreamingOptions,
}

impl FileSession {
    pub(crate) fn new(
        path: String,
        file: Box<dyn RemoteFile>,
        options: StreamingOptions,
        read_ahead: usize,
    ) -> Self {
        Self {
            path,
            file,
            state: SessionState::Open,
            offset: 0,
            size: None,
            read_ahead,
            options,
        }
    }

    /// Share-relative path, `/`-separated, with a leading `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// File size if it has been fetched already
    pub fn cached_size(&self) -> Option<u64> {
        self.size
    }

    pub fn read_ahead(&self) -> usize {
        self.read_ahead
    }

    pub fn streaming_options(&self) -> StreamingOptions {
        self.options
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(SmbError::SessionClosed(self.path.clone())),
        }
    }

    /// Sequential read from the current offset
    ///
    /// Returns `Ok(0)` at end of file. Short reads are normal.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.file.read(buf).map_err(|e| {
            tracing::error!("Read failed on {} at {}: {}", self.path, self.offset, e);
            e
        })?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Absolute seek from the start of the file
    ///
    /// Offsets past the end are accepted; the next read returns 0.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.ensure_open()?;
        self.offset = self.file.seek(offset)?;
        tracing::trace!("Seek {} to {}", self.path, self.offset);
        Ok(())
    }

    /// File size, fetched from remote metadata once and cached
    pub fn size(&mut self) -> Result<u64> {
        self.ensure_open()?;
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = self.file.size()?;
        self.size = Some(size);
        Ok(size)
    }

    /// Release the remote handle; later calls are no-ops
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        tracing::debug!("Closing {}", self.path);
        self.file.close()
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close {} on drop: {}", self.path, e);
        }
    }
}

impl fmt::Debug for FileSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSession")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("read_ahead", &self.read_ahead)
            .field("options", &self.options)
            .finish()
    }
}

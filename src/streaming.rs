//! Streaming read engine
//!
//! Media players ask for byte ranges; the remote protocol only offers
//! seek-then-sequential-read. Every ranged call here performs the seek and
//! the read as one unit on the session, which callers hold exclusively for
//! the duration of the call.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::DerefMut;

use bytes::{Bytes, BytesMut};

use crate::config::StreamingOptions;
use crate::error::Result;
use crate::session::FileSession;

impl FileSession {
    /// Jump to `offset` and read up to `buf.len()` bytes
    ///
    /// Any previously tracked offset is discarded.
    pub fn read_optimized(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.seek(offset)?;
        self.read(buf)
    }

    /// Read the half-open range `start..end`, clamped to `buf.len()`
    ///
    /// Never returns more than `min(buf.len(), end - start)` bytes and may
    /// return fewer; callers loop. `end <= start` reads nothing.
    pub fn read_range(&mut self, buf: &mut [u8], start: u64, end: u64) -> Result<usize> {
        self.ensure_open()?;
        let span = end.saturating_sub(start);
        let want = usize::try_from(span).unwrap_or(usize::MAX).min(buf.len());
        if want == 0 {
            return Ok(0);
        }
        tracing::debug!("Range read {} [{}, {}) want {}", self.path(), start, end, want);
        self.seek(start)?;
        self.read(&mut buf[..want])
    }

    /// Same contract as [`read_range`](Self::read_range); blocks the caller
    pub fn read_range_async(&mut self, buf: &mut [u8], start: u64, end: u64) -> Result<usize> {
        self.read_range(buf, start, end)
    }

    /// Position the session at `start` for an upcoming range
    ///
    /// Nothing is fetched in the background.
    pub fn prefetch_range(&mut self, start: u64, end: u64) -> Result<()> {
        tracing::debug!("Prefetch hint {} [{}, {})", self.path(), start, end);
        self.seek(start)
    }

    /// Store a read-ahead hint
    pub fn set_read_ahead(&mut self, size: usize) -> Result<()> {
        self.ensure_open()?;
        self.read_ahead = size;
        Ok(())
    }

    /// Replace the tuning used by chunked loops
    pub fn set_streaming_options(&mut self, options: StreamingOptions) -> Result<()> {
        self.ensure_open()?;
        options.validate()?;
        self.options = options;
        Ok(())
    }

    /// Read `start..end` completely, stopping early only at end of file
    ///
    /// Issues sequential reads of at most `chunk_size` bytes after a single
    /// seek.
    pub fn read_exact_range(&mut self, start: u64, end: u64) -> Result<Bytes> {
        self.ensure_open()?;
        let span = end.saturating_sub(start);
        if span == 0 {
            return Ok(Bytes::new());
        }
        let chunk_size = self.options.chunk_size.max(1);
        let capacity = usize::try_from(span)
            .unwrap_or(usize::MAX)
            .min(self.options.buffer_size);
        let mut out = BytesMut::with_capacity(capacity);
        let mut chunk = vec![0u8; chunk_size];

        self.seek(start)?;
        let mut remaining = span;
        while remaining > 0 {
            let want = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(chunk_size);
            let n = self.read(&mut chunk[..want])?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            remaining -= n as u64;
        }
        Ok(out.freeze())
    }
}

/// `std::io` adapter over a file session
///
/// Works over anything that derefs to a session: `&mut FileSession` or a
/// lock guard. The reader keeps its own position and re-seeks only when the
/// session offset has moved underneath it.
pub struct SessionReader<S> {
    session: S,
    position: u64,
}

impl<S: DerefMut<Target = FileSession>> SessionReader<S> {
    pub fn new(session: S) -> Self {
        let position = session.offset();
        Self { session, position }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> S {
        self.session
    }
}

fn to_io(err: crate::error::SmbError) -> io::Error {
    match err {
        crate::error::SmbError::Io(e) => e,
        other => io::Error::other(other),
    }
}

impl<S: DerefMut<Target = FileSession>> Read for SessionReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = if self.session.offset() == self.position {
            self.session.read(buf)
        } else {
            self.session.read_optimized(buf, self.position)
        }
        .map_err(to_io)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<S: DerefMut<Target = FileSession>> Seek for SessionReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let size = self.session.size().map_err(to_io)?;
                size.checked_add_signed(delta)
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.position = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmbError;
    use crate::session::tests::{open_session, sample_share};
    use crate::transport::memory::MemoryShare;

    fn expected(range: std::ops::Range<usize>) -> Vec<u8> {
        range.map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_read_optimized_discards_offset() {
        let share = sample_share(1000);
        let mut session = open_session(&share, "/videos/movie.mp4");
        let mut buf = [0u8; 10];
        session.read(&mut buf).unwrap();
        assert_eq!(session.read_optimized(&mut buf, 500).unwrap(), 10);
        assert_eq!(buf.to_vec(), expected(500..510));
        assert_eq!(session.offset(), 510);
    }

    #[test]
    fn test_read_range_clamps_to_buffer_and_span() {
        let share = sample_share(10_000);
        let mut session = open_session(&share, "/videos/movie.mp4");
        let mut buf = vec![0u8; 100];

        assert_eq!(session.read_range(&mut buf, 0, 1_000).unwrap(), 100);
        assert_eq!(session.read_range(&mut buf, 50, 60).unwrap(), 10);
        assert_eq!(&buf[..10], expected(50..60).as_slice());
        assert_eq!(session.read_range(&mut buf, 60, 60).unwrap(), 0);
        assert_eq!(session.read_range(&mut buf, 70, 60).unwrap(), 0);
        assert_eq!(session.read_range(&mut buf, 9_990, 20_000).unwrap(), 10);
    }

    #[test]
    fn test_contiguous_ranges_concatenate() {
        let share = sample_share(4096);
        let mut session = open_session(&share, "/videos/movie.mp4");
        let mut whole = vec![0u8; 3000];
        let n = session.read_range(&mut whole, 500, 3500).unwrap();
        assert_eq!(n, 3000);

        let mut first = vec![0u8; 1200];
        let mut second = vec![0u8; 1800];
        session.read_range(&mut first, 500, 1700).unwrap();
        session.read_range_async(&mut second, 1700, 3500).unwrap();
        first.extend_from_slice(&second);
        assert_eq!(first, whole);
    }

    #[test]
    fn test_short_remote_reads_are_returned_as_is() {
        let share = MemoryShare::new("fileserver", "share1").with_max_read_size(256);
        share.add_file("clip.mkv", vec![7u8; 4096]);
        let mut session = open_session(&share, "clip.mkv");
        let mut buf = vec![0u8; 1024];
        assert_eq!(session.read_range(&mut buf, 0, 1024).unwrap(), 256);
    }

    #[test]
    fn test_read_exact_range_loops_over_short_reads() {
        let share = MemoryShare::new("fileserver", "share1").with_max_read_size(300);
        share.add_file(
            "clip.mkv",
            (0..5000usize).map(|i| (i % 251) as u8).collect::<Vec<_>>(),
        );
        let mut session = open_session(&share, "clip.mkv");
        session
            .set_streaming_options(StreamingOptions::new(1024, 4096, true))
            .unwrap();
        let seeks = share.seeks();
        let data = session.read_exact_range(100, 2100).unwrap();
        assert_eq!(share.seeks(), seeks + 1);
        assert_eq!(data.len(), 2000);
        assert_eq!(data.to_vec(), expected(100..2100));

        let tail = session.read_exact_range(4900, 6000).unwrap();
        assert_eq!(tail.len(), 100);
        assert!(session.read_exact_range(10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_prefetch_only_seeks() {
        let share = sample_share(1000);
        let mut session = open_session(&share, "/videos/movie.mp4");
        session.prefetch_range(300, 900).unwrap();
        assert_eq!(session.offset(), 300);
        let mut buf = [0u8; 5];
        session.read(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), expected(300..305));
    }

    #[test]
    fn test_hints_and_options_stored() {
        let share = sample_share(10);
        let mut session = open_session(&share, "/videos/movie.mp4");
        session.set_read_ahead(512 * 1024).unwrap();
        assert_eq!(session.read_ahead(), 512 * 1024);

        let options = StreamingOptions::new(32 * 1024, 1024 * 1024, false);
        session.set_streaming_options(options).unwrap();
        assert_eq!(session.streaming_options(), options);

        let bad = StreamingOptions::new(0, 1024, true);
        assert!(matches!(
            session.set_streaming_options(bad),
            Err(SmbError::InvalidParameter(_))
        ));
        assert_eq!(session.streaming_options(), options);
    }

    #[test]
    fn test_closed_session_rejects_engine_calls() {
        let share = sample_share(10);
        let mut session = open_session(&share, "/videos/movie.mp4");
        session.close().unwrap();
        let mut buf = [0u8; 4];
        assert!(session.read_range(&mut buf, 0, 4).is_err());
        assert!(session.read_range(&mut buf, 4, 0).is_err());
        assert!(session.prefetch_range(0, 4).is_err());
        assert!(session.set_read_ahead(1).is_err());
    }

    #[test]
    fn test_session_reader_read_and_seek() {
        let share = sample_share(2000);
        let mut session = open_session(&share, "/videos/movie.mp4");
        let mut reader = SessionReader::new(&mut session);

        reader.seek(SeekFrom::Start(1000)).unwrap();
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), expected(1000..1008));

        reader.seek(SeekFrom::End(-4)).unwrap();
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, expected(1996..2000));

        assert!(reader.seek(SeekFrom::Current(-5000)).is_err());
        assert_eq!(reader.position(), 2000);
    }
}

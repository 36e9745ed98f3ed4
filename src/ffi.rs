//! C-ABI bridge
//!
//! Flat `extern "C"` entry points over a process-wide [`SmbClient`].
//! Handles cross the boundary as `uint64_t` values where 0 means failure.
//! No call unwinds into the host: every entry point catches panics and
//! degrades to its failure sentinel, recording an error code that
//! `smb_get_last_error` returns on the same thread.
//!
//! Strings returned by the bridge are owned by the caller and released with
//! `smb_free_string`. Directory and thumbnail results are released with their
//! matching free function, which is safe to call more than once.

use std::cell::Cell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::client::SmbClient;
use crate::config::{ClientConfig, LogLevel, StreamingOptions};
use crate::directory::DirectoryEntry;
use crate::error::{ErrorCode, Result, SmbError};
use crate::registry::{ConnectionId, SessionId};
use crate::transport::{Connector, ShareTarget, ShareTransport};

/// Opaque connection handle; 0 is never valid
pub type SmbConnectionHandle = u64;

/// Opaque file handle; 0 is never valid
pub type SmbFileHandle = u64;

/// One directory entry as seen by C callers
#[repr(C)]
#[derive(Debug)]
pub struct SmbFileInfo {
    pub name: *mut c_char,
    pub path: *mut c_char,
    pub size: u64,
    pub modified_time: u64,
    pub is_directory: c_int,
    pub error_code: c_int,
}

/// Directory listing; `files` is null when `count` is 0
#[repr(C)]
#[derive(Debug)]
pub struct SmbDirectoryResult {
    pub files: *mut SmbFileInfo,
    pub count: usize,
    pub error_code: c_int,
}

/// Reserved thumbnail result; no decoder is shipped
#[repr(C)]
#[derive(Debug)]
pub struct ThumbnailResult {
    pub data: *mut u8,
    pub size: usize,
    pub width: c_int,
    pub height: c_int,
    pub error_code: c_int,
}

/// Used when no SMB transport is compiled in
struct NoTransport;

impl Connector for NoTransport {
    fn name(&self) -> &str {
        "none"
    }

    fn connect(&self, _target: &ShareTarget) -> Result<Box<dyn ShareTransport>> {
        Err(SmbError::Unsupported(
            "no SMB transport available (build with the smb-native feature)",
        ))
    }
}

static CLIENT: Lazy<SmbClient> = Lazy::new(|| {
    #[cfg(feature = "smb-native")]
    match crate::transport::smb2::Smb2Connector::new() {
        Ok(connector) => return SmbClient::new(Arc::new(connector), ClientConfig::default()),
        Err(e) => tracing::error!("SMB transport unavailable: {}", e),
    }
    SmbClient::new(Arc::new(NoTransport), ClientConfig::default())
});

thread_local! {
    static LAST_ERROR: Cell<c_int> = const { Cell::new(0) };
}

/// The client behind the bridge
pub fn client() -> &'static SmbClient {
    &CLIENT
}

/// Replace the connector used by later `smb_connect` calls
pub fn set_connector(connector: Arc<dyn Connector>) {
    CLIENT.set_connector(connector);
}

fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|last| last.set(code.as_raw()));
}

/// Run `f`, catching errors and panics; `fallback` is returned on failure
fn guard<T>(fallback: T, f: impl FnOnce() -> Result<T>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            set_last_error(ErrorCode::Success);
            value
        }
        Ok(Err(e)) => {
            tracing::debug!("Bridge call failed: {}", e);
            set_last_error(e.code());
            fallback
        }
        Err(_) => {
            tracing::error!("Panic caught at bridge boundary");
            set_last_error(ErrorCode::Unknown);
            fallback
        }
    }
}

/// Like [`guard`] for calls that report a status code
fn status(f: impl FnOnce() -> Result<()>) -> c_int {
    guard((), f);
    last_error()
}

fn last_error() -> c_int {
    LAST_ERROR.with(|last| last.get())
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn text<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(SmbError::InvalidParameter(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| SmbError::InvalidParameter(format!("{} is not valid UTF-8", what)))
}

/// # Safety
/// As for [`text`]; null is read as an empty string.
unsafe fn optional_text<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        Ok("")
    } else {
        text(ptr, what)
    }
}

fn into_c_string(value: String) -> Result<*mut c_char> {
    CString::new(value)
        .map(CString::into_raw)
        .map_err(|_| SmbError::InvalidParameter("string contains NUL".to_string()))
}

fn connection_id(raw: SmbConnectionHandle) -> Result<ConnectionId> {
    ConnectionId::from_raw(raw)
        .ok_or_else(|| SmbError::InvalidParameter(format!("invalid connection handle {:#x}", raw)))
}

fn session_id(raw: SmbFileHandle) -> Result<SessionId> {
    SessionId::from_raw(raw)
        .ok_or_else(|| SmbError::InvalidParameter(format!("invalid file handle {:#x}", raw)))
}

/// # Safety
/// `buffer` must be valid for `len` writable bytes when non-null.
unsafe fn out_buffer<'a>(buffer: *mut u8, len: usize) -> Result<&'a mut [u8]> {
    if buffer.is_null() {
        return Err(SmbError::InvalidParameter("buffer is null".to_string()));
    }
    Ok(std::slice::from_raw_parts_mut(buffer, len))
}

/// # Safety
/// `out` must be null or valid for one `usize` write.
unsafe fn write_count(out: *mut usize, value: usize) {
    if !out.is_null() {
        *out = value;
    }
}

// ---- connection ----------------------------------------------------------

/// Connect with no domain. Returns 0 on failure.
///
/// # Safety
/// All pointers must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn smb_connect(
    server: *const c_char,
    share: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> SmbConnectionHandle {
    smb_connect_with_domain(server, share, username, password, ptr::null())
}

/// Connect with an explicit domain; null or empty means none.
///
/// # Safety
/// All pointers must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn smb_connect_with_domain(
    server: *const c_char,
    share: *const c_char,
    username: *const c_char,
    password: *const c_char,
    domain: *const c_char,
) -> SmbConnectionHandle {
    guard(0, || {
        let server = text(server, "server")?;
        let share = text(share, "share")?;
        let username = optional_text(username, "username")?;
        let password = optional_text(password, "password")?;
        let domain = optional_text(domain, "domain")?;
        let id = CLIENT.connect_with_domain(server, share, username, password, domain)?;
        Ok(id.to_raw())
    })
}

/// Close every file of the connection, then disconnect. Stale handles are ignored.
#[no_mangle]
pub extern "C" fn smb_disconnect(handle: SmbConnectionHandle) {
    guard((), || match ConnectionId::from_raw(handle) {
        Some(id) => CLIENT.disconnect(id),
        None => Ok(()),
    })
}

#[no_mangle]
pub extern "C" fn smb_is_connected(handle: SmbConnectionHandle) -> c_int {
    guard(0, || Ok(CLIENT.is_connected(connection_id(handle)?) as c_int))
}

/// Negotiated dialect name; free with `smb_free_string`
#[no_mangle]
pub extern "C" fn smb_get_version(handle: SmbConnectionHandle) -> *mut c_char {
    guard(ptr::null_mut(), || {
        into_c_string(CLIENT.version(connection_id(handle)?)?)
    })
}

#[no_mangle]
pub extern "C" fn smb_get_connection_info(handle: SmbConnectionHandle) -> *mut c_char {
    guard(ptr::null_mut(), || {
        into_c_string(CLIENT.connection_info(connection_id(handle)?)?)
    })
}

#[no_mangle]
pub extern "C" fn smb_get_connection_url(handle: SmbConnectionHandle) -> *mut c_char {
    guard(ptr::null_mut(), || {
        into_c_string(CLIENT.connection_url(connection_id(handle)?)?)
    })
}

/// # Safety
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn smb_generate_direct_url(
    handle: SmbConnectionHandle,
    path: *const c_char,
) -> *mut c_char {
    guard(ptr::null_mut(), || {
        let path = optional_text(path, "path")?;
        into_c_string(CLIENT.generate_direct_url(connection_id(handle)?, path)?)
    })
}

/// # Safety
/// All pointers must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn smb_generate_url_with_credentials(
    handle: SmbConnectionHandle,
    path: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> *mut c_char {
    guard(ptr::null_mut(), || {
        let path = optional_text(path, "path")?;
        let username = text(username, "username")?;
        let password = text(password, "password")?;
        into_c_string(CLIENT.generate_url_with_credentials(
            connection_id(handle)?,
            path,
            username,
            password,
        )?)
    })
}

// ---- files ---------------------------------------------------------------

/// Open a file read-only. Returns 0 on failure.
///
/// # Safety
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn smb_open_file(
    handle: SmbConnectionHandle,
    path: *const c_char,
) -> SmbFileHandle {
    guard(0, || {
        let path = text(path, "path")?;
        Ok(CLIENT.open_file(connection_id(handle)?, path)?.to_raw())
    })
}

/// Open a file with the streaming read-ahead preset. Returns 0 on failure.
///
/// # Safety
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn smb_open_file_for_streaming(
    handle: SmbConnectionHandle,
    path: *const c_char,
) -> SmbFileHandle {
    guard(0, || {
        let path = text(path, "path")?;
        Ok(CLIENT.open_for_streaming(connection_id(handle)?, path)?.to_raw())
    })
}

/// Release a file handle. Stale handles are ignored.
#[no_mangle]
pub extern "C" fn smb_close_file(handle: SmbFileHandle) {
    guard((), || match SessionId::from_raw(handle) {
        Some(id) => CLIENT.close_file(id),
        None => Ok(()),
    })
}

/// Sequential read. `*bytes_read` is 0 at end of file and on error.
///
/// # Safety
/// `buffer` must be valid for `buffer_size` bytes; `bytes_read` must be
/// valid for one write.
#[no_mangle]
pub unsafe extern "C" fn smb_read_chunk(
    handle: SmbFileHandle,
    buffer: *mut u8,
    buffer_size: usize,
    bytes_read: *mut usize,
) -> c_int {
    write_count(bytes_read, 0);
    status(|| {
        if bytes_read.is_null() {
            return Err(SmbError::InvalidParameter("bytes_read is null".to_string()));
        }
        let buf = out_buffer(buffer, buffer_size)?;
        let n = CLIENT.read(session_id(handle)?, buf)?;
        write_count(bytes_read, n);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn smb_seek_file(handle: SmbFileHandle, offset: u64) -> c_int {
    status(|| CLIENT.seek(session_id(handle)?, offset))
}

/// File size, or 0 on failure; check `smb_get_last_error` to tell them apart
#[no_mangle]
pub extern "C" fn smb_get_file_size(handle: SmbFileHandle) -> u64 {
    guard(0, || CLIENT.file_size(session_id(handle)?))
}

/// Seek to `offset`, then read.
///
/// # Safety
/// As for [`smb_read_chunk`].
#[no_mangle]
pub unsafe extern "C" fn smb_read_chunk_optimized(
    handle: SmbFileHandle,
    buffer: *mut u8,
    buffer_size: usize,
    bytes_read: *mut usize,
    offset: u64,
) -> c_int {
    write_count(bytes_read, 0);
    status(|| {
        if bytes_read.is_null() {
            return Err(SmbError::InvalidParameter("bytes_read is null".to_string()));
        }
        let buf = out_buffer(buffer, buffer_size)?;
        let n = CLIENT.read_optimized(session_id(handle)?, buf, offset)?;
        write_count(bytes_read, n);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn smb_set_read_ahead(handle: SmbFileHandle, read_ahead_size: usize) -> c_int {
    status(|| CLIENT.set_read_ahead(session_id(handle)?, read_ahead_size))
}

/// Read `[start_offset, end_offset)` clamped to `buffer_size`.
///
/// # Safety
/// As for [`smb_read_chunk`].
#[no_mangle]
pub unsafe extern "C" fn smb_read_range(
    handle: SmbFileHandle,
    buffer: *mut u8,
    buffer_size: usize,
    start_offset: u64,
    end_offset: u64,
    bytes_read: *mut usize,
) -> c_int {
    write_count(bytes_read, 0);
    status(|| {
        if bytes_read.is_null() {
            return Err(SmbError::InvalidParameter("bytes_read is null".to_string()));
        }
        let buf = out_buffer(buffer, buffer_size)?;
        let n = CLIENT.read_range(session_id(handle)?, buf, start_offset, end_offset)?;
        write_count(bytes_read, n);
        Ok(())
    })
}

/// Same as [`smb_read_range`]; blocks the caller.
///
/// # Safety
/// As for [`smb_read_chunk`].
#[no_mangle]
pub unsafe extern "C" fn smb_read_range_async(
    handle: SmbFileHandle,
    buffer: *mut u8,
    buffer_size: usize,
    start_offset: u64,
    end_offset: u64,
    bytes_read: *mut usize,
) -> c_int {
    write_count(bytes_read, 0);
    status(|| {
        if bytes_read.is_null() {
            return Err(SmbError::InvalidParameter("bytes_read is null".to_string()));
        }
        let buf = out_buffer(buffer, buffer_size)?;
        let n = CLIENT.read_range_async(session_id(handle)?, buf, start_offset, end_offset)?;
        write_count(bytes_read, n);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn smb_prefetch_range(
    handle: SmbFileHandle,
    start_offset: u64,
    end_offset: u64,
) -> c_int {
    status(|| CLIENT.prefetch_range(session_id(handle)?, start_offset, end_offset))
}

#[no_mangle]
pub extern "C" fn smb_set_streaming_options(
    handle: SmbFileHandle,
    chunk_size: usize,
    buffer_size: usize,
    enable_caching: c_int,
) -> c_int {
    status(|| {
        let options = StreamingOptions::new(chunk_size, buffer_size, enable_caching != 0);
        CLIENT.set_streaming_options(session_id(handle)?, options)
    })
}

// ---- directories ---------------------------------------------------------

fn empty_directory_result(code: ErrorCode) -> SmbDirectoryResult {
    SmbDirectoryResult {
        files: ptr::null_mut(),
        count: 0,
        error_code: code.as_raw(),
    }
}

fn into_file_info(entry: DirectoryEntry) -> Result<SmbFileInfo> {
    let name = into_c_string(entry.name)?;
    let path = match into_c_string(entry.path) {
        Ok(path) => path,
        Err(e) => {
            // SAFETY: `name` was produced by `CString::into_raw` just above.
            drop(unsafe { CString::from_raw(name) });
            return Err(e);
        }
    };
    Ok(SmbFileInfo {
        name,
        path,
        size: entry.size,
        modified_time: entry.modified,
        is_directory: entry.is_directory as c_int,
        error_code: ErrorCode::Success.as_raw(),
    })
}

/// # Safety
/// `info` must come from [`into_file_info`] and not have been freed.
unsafe fn free_file_info(info: &mut SmbFileInfo) {
    for field in [&mut info.name, &mut info.path] {
        if !field.is_null() {
            drop(CString::from_raw(*field));
            *field = ptr::null_mut();
        }
    }
}

/// Box up a listing for C. Entries whose name or path cannot cross the
/// boundary are skipped; a listing where none can is a marshalling failure.
fn marshal_entries(entries: Vec<DirectoryEntry>) -> Result<SmbDirectoryResult> {
    if entries.is_empty() {
        return Ok(empty_directory_result(ErrorCode::Success));
    }

    let mut files: Vec<SmbFileInfo> = Vec::with_capacity(entries.len());
    for entry in entries {
        let shown = entry.path.escape_debug().to_string();
        match into_file_info(entry) {
            Ok(info) => files.push(info),
            Err(e) => tracing::warn!("Skipping directory entry {}: {}", shown, e),
        }
    }
    if files.is_empty() {
        return Err(SmbError::MemoryAllocation);
    }

    let files = files.into_boxed_slice();
    let count = files.len();
    Ok(SmbDirectoryResult {
        files: Box::into_raw(files) as *mut SmbFileInfo,
        count,
        error_code: ErrorCode::Success.as_raw(),
    })
}

/// List a directory. Free a non-empty result with `smb_free_directory_result`.
///
/// # Safety
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn smb_list_directory(
    handle: SmbConnectionHandle,
    path: *const c_char,
) -> SmbDirectoryResult {
    let result = guard(None, || {
        let path = text(path, "path")?;
        let entries = CLIENT.list_directory(connection_id(handle)?, path)?;
        marshal_entries(entries).map(Some)
    });
    result.unwrap_or_else(|| empty_directory_result(ErrorCode::from_raw(last_error())))
}

/// Release a listing; safe on empty or already-freed results.
///
/// # Safety
/// `result` must be null or point to a result returned by
/// `smb_list_directory`.
#[no_mangle]
pub unsafe extern "C" fn smb_free_directory_result(result: *mut SmbDirectoryResult) {
    if result.is_null() {
        return;
    }
    let result = &mut *result;
    if !result.files.is_null() {
        let files = ptr::slice_from_raw_parts_mut(result.files, result.count);
        let mut files = Box::from_raw(files);
        for info in files.iter_mut() {
            free_file_info(info);
        }
    }
    result.files = ptr::null_mut();
    result.count = 0;
}

// ---- thumbnails ----------------------------------------------------------

/// Reserved; always fails with the thumbnail error code.
///
/// # Safety
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn smb_generate_thumbnail(
    handle: SmbConnectionHandle,
    path: *const c_char,
    width: c_int,
    height: c_int,
) -> ThumbnailResult {
    guard((), || {
        let path = text(path, "path")?;
        connection_id(handle)?;
        Err(SmbError::ThumbnailGeneration(format!(
            "{} ({}x{}): no decoder available",
            path, width, height
        )))
    });
    ThumbnailResult {
        data: ptr::null_mut(),
        size: 0,
        width: 0,
        height: 0,
        error_code: last_error(),
    }
}

/// Release a thumbnail result; safe on empty or already-freed results.
///
/// # Safety
/// `result` must be null or point to a result returned by
/// `smb_generate_thumbnail`.
#[no_mangle]
pub unsafe extern "C" fn smb_free_thumbnail_result(result: *mut ThumbnailResult) {
    if result.is_null() {
        return;
    }
    let result = &mut *result;
    if !result.data.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            result.data,
            result.size,
        )));
    }
    result.data = ptr::null_mut();
    result.size = 0;
}

// ---- utilities -----------------------------------------------------------

/// Static message for an error code; never null, never freed
#[no_mangle]
pub extern "C" fn smb_get_error_message(error_code: c_int) -> *const c_char {
    ErrorCode::from_raw(error_code).message_c_str().as_ptr()
}

/// Error code of the last bridge call on this thread
#[no_mangle]
pub extern "C" fn smb_get_last_error() -> c_int {
    last_error()
}

/// # Safety
/// `value` must be null or a string returned by this bridge.
#[no_mangle]
pub unsafe extern "C" fn smb_free_string(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}

/// Install a stderr subscriber at `level` (0 = error .. 4 = trace)
#[no_mangle]
pub extern "C" fn smb_init_logging(level: c_int) -> c_int {
    status(|| {
        let config = ClientConfig {
            log_level: LogLevel::from_raw(level),
            ..Default::default()
        };
        crate::logging::init_logging(&config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_match_codes() {
        for raw in [0, -1, -2, -3, -4, -5, -6, -7, -999, 17] {
            let message = unsafe { CStr::from_ptr(smb_get_error_message(raw)) };
            assert_eq!(message.to_str().unwrap(), crate::error::error_message(raw));
        }
    }

    #[test]
    fn test_guard_catches_panics() {
        let value = guard(7, || -> Result<i32> { panic!("boom") });
        assert_eq!(value, 7);
        assert_eq!(smb_get_last_error(), ErrorCode::Unknown.as_raw());
    }

    #[test]
    fn test_status_reports_codes() {
        assert_eq!(status(|| Ok(())), 0);
        assert_eq!(status(|| Err(SmbError::Auth("x".into()))), -2);
        assert_eq!(smb_get_last_error(), -2);
    }

    #[test]
    fn test_zero_handles_are_rejected() {
        assert_eq!(smb_is_connected(0), 0);
        assert_eq!(smb_get_last_error(), ErrorCode::InvalidParameter.as_raw());
        assert_eq!(smb_seek_file(0, 10), ErrorCode::InvalidParameter.as_raw());
        assert_eq!(smb_get_file_size(0), 0);
        smb_close_file(0);
        smb_disconnect(0);
    }

    #[test]
    fn test_null_pointers_are_rejected() {
        unsafe {
            assert_eq!(smb_connect(ptr::null(), ptr::null(), ptr::null(), ptr::null()), 0);
            assert_eq!(smb_get_last_error(), ErrorCode::InvalidParameter.as_raw());
            let mut n = 99usize;
            let rc = smb_read_chunk(1 << 32, ptr::null_mut(), 10, &mut n);
            assert_eq!(rc, ErrorCode::InvalidParameter.as_raw());
            assert_eq!(n, 0);
            smb_free_string(ptr::null_mut());
            smb_free_directory_result(ptr::null_mut());
            smb_free_thumbnail_result(ptr::null_mut());
        }
    }

    #[test]
    fn test_free_directory_result_twice() {
        let entries = vec![DirectoryEntry {
            name: "a.mp4".into(),
            path: "/a.mp4".into(),
            size: 1,
            modified: 2,
            is_directory: false,
        }];
        let files: Box<[SmbFileInfo]> = entries
            .into_iter()
            .map(|e| into_file_info(e).unwrap())
            .collect();
        let count = files.len();
        let mut result = SmbDirectoryResult {
            files: Box::into_raw(files) as *mut SmbFileInfo,
            count,
            error_code: 0,
        };
        unsafe {
            smb_free_directory_result(&mut result);
            smb_free_directory_result(&mut result);
        }
        assert!(result.files.is_null());
        assert_eq!(result.count, 0);
    }

    fn entry(path: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path: path.to_string(),
            size: 10,
            modified: 0,
            is_directory: false,
        }
    }

    #[test]
    fn test_marshal_skips_entries_with_interior_nul() {
        let entries = vec![
            entry("/d/good.mp4"),
            entry("/d/bad\0name.mp4"),
            entry("/d/other.mp4"),
        ];
        let mut result = marshal_entries(entries).unwrap();
        assert_eq!(result.error_code, 0);
        assert_eq!(result.count, 2);
        let files = unsafe { std::slice::from_raw_parts(result.files, result.count) };
        let paths: Vec<&str> = files
            .iter()
            .map(|f| unsafe { CStr::from_ptr(f.path) }.to_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/d/good.mp4", "/d/other.mp4"]);
        unsafe { smb_free_directory_result(&mut result) };
    }

    #[test]
    fn test_marshal_with_no_usable_entry_is_allocation_failure() {
        let err = marshal_entries(vec![entry("/d/only\0bad.mp4")]).unwrap_err();
        assert!(matches!(err, SmbError::MemoryAllocation));
        assert_eq!(err.code(), ErrorCode::MemoryAllocation);

        let empty = marshal_entries(Vec::new()).unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.files.is_null());
        assert_eq!(empty.error_code, 0);
    }
}

//! Integration tests for the exported C ABI.
//!
//! # Purpose
//!
//! Calls the `extern "C"` functions exactly as a C host would: raw C
//! strings in, integer handles and owned error strings out, tiles delivered
//! through `extern "C"` callbacks.  Verifies:
//!
//! - Every call yields exactly one of {result, error}.
//! - Error strings carry their kind prefix and are released with
//!   `rdp_free_string`.
//! - A host error string returned from the tile callback is copied and
//!   handed back to the host's free function exactly once.
//!
//! # Process-wide state
//!
//! The C ABI has one client per process, so every test goes through
//! [`setup`], which installs the mock connector and the callbacks once.
//! Tests run in parallel against that shared client and only ever assert on
//! their own sessions.

use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use rdp_client::infrastructure::engine::mock::{MockConnector, ScriptStep};
use rdp_client::infrastructure::ffi::{
    install_connector, rdp_close, rdp_connect, rdp_free, rdp_free_string, rdp_init,
    rdp_read_output, rdp_register_callbacks, rdp_write_keyboard, rdp_write_pointer, CBitmap, CKey,
    CPointer,
};
use rdp_client::ClientConfig;
use rdp_core::{BitmapTile, TileRect};

/// Correlation id whose deliveries the host callback refuses.
const FAILING_REF: i64 = -1;

static SETUP: Once = Once::new();
static DELIVERED: Mutex<Vec<(i64, [u16; 4], Vec<u8>)>> = Mutex::new(Vec::new());
static HOST_STRINGS_FREED: AtomicUsize = AtomicUsize::new(0);

fn script_tiles() -> Vec<BitmapTile> {
    (0..3u16)
        .map(|i| BitmapTile::new(TileRect::new(i * 8, 0, i * 8 + 7, 7), vec![i as u8; 256]))
        .collect()
}

unsafe extern "C" fn host_deliver_tile(client_ref: i64, bitmap: CBitmap) -> *mut c_char {
    // SAFETY: the library guarantees the buffer is valid for this call.
    let pixels = unsafe { std::slice::from_raw_parts(bitmap.data_ptr, bitmap.data_len) }.to_vec();
    let rect = [bitmap.dest_left, bitmap.dest_top, bitmap.dest_right, bitmap.dest_bottom];
    DELIVERED.lock().unwrap().push((client_ref, rect, pixels));
    if client_ref == FAILING_REF {
        return CString::new("host sink full").unwrap().into_raw();
    }
    std::ptr::null_mut()
}

unsafe extern "C" fn host_free_string(s: *mut c_char) {
    HOST_STRINGS_FREED.fetch_add(1, Ordering::SeqCst);
    // SAFETY: every string the callback returns came from `CString::into_raw`.
    drop(unsafe { CString::from_raw(s) });
}

fn setup() {
    SETUP.call_once(|| {
        rdp_init();
        let script = vec![ScriptStep::Batch(script_tiles()), ScriptStep::End];
        let connector = MockConnector::new().with_script(script);
        install_connector(Arc::new(connector), &ClientConfig::default()).expect("install");
        let err = rdp_register_callbacks(Some(host_deliver_tile), Some(host_free_string));
        assert!(err.is_null());
    });
}

/// Copies and releases a library error string; `None` for success.
fn take_err(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    unsafe { rdp_free_string(ptr) };
    Some(text)
}

fn key(code: u16, down: bool) -> CKey {
    CKey { code, down }
}

fn pointer(x: u16, y: u16, button: u32, down: bool) -> CPointer {
    CPointer { x, y, button, down }
}

fn connect(width: u16, height: u16) -> (u64, Option<String>) {
    let addr = CString::new("10.0.0.5:3389").unwrap();
    let user = CString::new("alice").unwrap();
    let pass = CString::new("s3cret").unwrap();
    let result = unsafe { rdp_connect(addr.as_ptr(), user.as_ptr(), pass.as_ptr(), width, height) };
    (result.handle, take_err(result.err))
}

fn deliveries_for(client_ref: i64) -> Vec<([u16; 4], Vec<u8>)> {
    DELIVERED
        .lock()
        .unwrap()
        .iter()
        .filter(|(r, _, _)| *r == client_ref)
        .map(|(_, rect, px)| (*rect, px.clone()))
        .collect()
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[test]
fn test_full_session_through_c_abi() {
    // Arrange
    setup();
    let (handle, err) = connect(1024, 768);
    assert_eq!(err, None);
    assert_ne!(handle, 0);

    // Act
    let read = take_err(rdp_read_output(handle, 7));
    let key_err = take_err(rdp_write_keyboard(handle, key(0x1E, true)));
    let pointer_err = take_err(rdp_write_pointer(handle, pointer(5, 5, 1, true)));
    let close = take_err(rdp_close(handle));
    let close_again = take_err(rdp_close(handle));
    rdp_free(handle);
    rdp_free(handle);

    // Assert
    assert_eq!(read, None);
    assert_eq!(key_err, None);
    assert_eq!(pointer_err, None);
    assert_eq!(close, None);
    assert_eq!(close_again, None);
    let expected: Vec<([u16; 4], Vec<u8>)> = script_tiles()
        .into_iter()
        .map(|t| ([t.rect.left, t.rect.top, t.rect.right, t.rect.bottom], t.pixels))
        .collect();
    assert_eq!(deliveries_for(7), expected);
}

#[test]
fn test_freed_handle_is_usage_error() {
    // Arrange
    setup();
    let (handle, _) = connect(800, 600);
    rdp_free(handle);

    // Act
    let err = take_err(rdp_write_keyboard(handle, key(1, true)));
    let close = take_err(rdp_close(handle));

    // Assert
    assert!(err.unwrap().starts_with("usage: "));
    assert!(close.unwrap().starts_with("usage: "));
}

// ── Error marshaling ──────────────────────────────────────────────────────────

#[test]
fn test_host_callback_error_is_copied_and_freed_once() {
    // Arrange
    setup();
    let (handle, _) = connect(800, 600);

    // Act
    let err = take_err(rdp_read_output(handle, FAILING_REF));
    rdp_free(handle);

    // Assert: the stream stopped at the first refused tile.
    let message = err.expect("callback failure must surface");
    assert!(message.starts_with("callback: "), "got: {message}");
    assert!(message.contains("host sink full"), "got: {message}");
    assert_eq!(deliveries_for(FAILING_REF).len(), 1);
    assert_eq!(HOST_STRINGS_FREED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_null_address_is_error_without_handle() {
    setup();
    let user = CString::new("alice").unwrap();
    let pass = CString::new("pw").unwrap();

    let result = unsafe { rdp_connect(std::ptr::null(), user.as_ptr(), pass.as_ptr(), 800, 600) };

    assert_eq!(result.handle, 0);
    assert_eq!(take_err(result.err).unwrap(), "usage: usage error: address is a null pointer");
}

#[test]
fn test_zero_width_is_connection_error_without_handle() {
    setup();

    let (handle, err) = connect(0, 600);

    assert_eq!(handle, 0);
    assert!(err.unwrap().starts_with("connection: invalid connection parameters"));
}

#[test]
fn test_unknown_pointer_button_is_usage_error() {
    // Arrange
    setup();
    let (handle, _) = connect(800, 600);

    // Act
    let err = take_err(rdp_write_pointer(handle, pointer(1, 1, 9, true)));
    rdp_free(handle);

    // Assert
    assert_eq!(err.unwrap(), "usage: usage error: unknown pointer button 9");
}

#[test]
fn test_rejected_pointer_carries_rejected_kind() {
    setup();
    let (handle, _) = connect(800, 600);

    let err = take_err(rdp_write_pointer(handle, pointer(900, 1, 0, false)));
    rdp_free(handle);

    assert!(err.unwrap().starts_with("rejected: "));
}

// ── Misuse ────────────────────────────────────────────────────────────────────

#[test]
fn test_zero_handle_is_rejected_everywhere() {
    setup();

    assert!(take_err(rdp_close(0)).unwrap().starts_with("usage: "));
    assert!(take_err(rdp_read_output(0, 1)).unwrap().starts_with("usage: "));
    rdp_free(0);
}

#[test]
fn test_null_callbacks_are_refused_and_keep_registration() {
    // Arrange
    setup();

    // Act
    let err = take_err(rdp_register_callbacks(None, None));

    // Assert: refused, and the earlier registration still delivers tiles.
    assert!(err.unwrap().starts_with("usage: "));
    let (handle, _) = connect(800, 600);
    assert_eq!(take_err(rdp_read_output(handle, 99)), None);
    rdp_free(handle);
    assert_eq!(deliveries_for(99).len(), 3);
}

#[test]
fn test_second_install_is_refused() {
    setup();

    let err =
        install_connector(Arc::new(MockConnector::new()), &ClientConfig::default()).unwrap_err();

    assert_eq!(err.kind(), rdp_client::ErrorKind::Usage);
}

#[test]
fn test_free_string_accepts_null() {
    unsafe { rdp_free_string(std::ptr::null_mut()) };
}

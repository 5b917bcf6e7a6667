//! C ABI exported to the host process.
//!
//! # Shape of the boundary (for beginners)
//!
//! A C caller cannot hold Rust values, so every exported function takes and
//! returns only plain C types:
//!
//! - A session is a `uint64_t` handle: the arena generation in the high 32
//!   bits, the slot index in the low 32.  Zero is never issued.  A handle
//!   that was freed simply stops resolving; it is never dereferenced.
//! - Errors are `char *` strings allocated here and released by the host
//!   with [`rdp_free_string`].  Null means success.  A call never returns
//!   both a handle and an error.
//! - Tiles reach the host through a registered callback that receives a
//!   [`CBitmap`] borrowing the pixel buffer for the duration of the call.
//!
//! The process-wide client is created by [`install_connector`], which an
//! embedding crate calls once with its engine before the host connects.
//!
//! Every exported function catches panics, so unwinding never crosses into
//! the host.

mod host_sink;
pub mod marshal;

use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use rdp_core::{BitmapTile, EngineConnector, KeyboardEvent, PointerButton, PointerEvent};
use tracing::{error, info};
use zeroize::Zeroizing;

use self::host_sink::HostTileSink;
use self::marshal::{copy_c_str, into_c_error, into_c_result, release_c_string};
use crate::application::error::ClientError;
use crate::application::registry::SessionHandle;
use crate::client::RdpClient;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::config::ClientConfig;

// ── C types ───────────────────────────────────────────────────────────────────

/// Result of [`rdp_connect`]: exactly one of the fields is set.
#[repr(C)]
#[derive(Debug)]
pub struct HandleOrError {
    /// Non-zero on success.
    pub handle: u64,
    /// Non-null on failure; release with [`rdp_free_string`].
    pub err: *mut c_char,
}

/// Pointer event as passed by the host.
///
/// `button` is a plain integer (0 none, 1 left, 2 right, 3 middle) so an
/// out-of-range value from C is an error instead of an invalid enum.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CPointer {
    pub x: u16,
    pub y: u16,
    pub button: u32,
    pub down: bool,
}

/// Keyboard event as passed by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CKey {
    pub code: u16,
    pub down: bool,
}

/// A tile as seen by the host callback.  The pixel buffer is borrowed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CBitmap {
    pub dest_left: u16,
    pub dest_top: u16,
    pub dest_right: u16,
    pub dest_bottom: u16,
    pub data_ptr: *const u8,
    pub data_len: usize,
    pub data_cap: usize,
}

impl CBitmap {
    fn borrowing(tile: &BitmapTile) -> Self {
        Self {
            dest_left: tile.rect.left,
            dest_top: tile.rect.top,
            dest_right: tile.rect.right,
            dest_bottom: tile.rect.bottom,
            data_ptr: tile.pixels.as_ptr(),
            data_len: tile.len(),
            data_cap: tile.capacity(),
        }
    }
}

/// Host tile callback.  Returns null on success or a host-allocated error
/// string, which the library releases through [`FreeHostStringFn`].
pub type DeliverTileFn = unsafe extern "C" fn(client_ref: i64, bitmap: CBitmap) -> *mut c_char;

/// Host function releasing strings returned by [`DeliverTileFn`].
pub type FreeHostStringFn = unsafe extern "C" fn(s: *mut c_char);

#[derive(Clone, Copy)]
struct HostCallbacks {
    deliver_tile: DeliverTileFn,
    free_host_string: FreeHostStringFn,
}

// ── Process-wide state ────────────────────────────────────────────────────────

static CLIENT: OnceLock<RdpClient> = OnceLock::new();
static CALLBACKS: RwLock<Option<HostCallbacks>> = RwLock::new(None);

/// Creates the process-wide client over `connector`.
///
/// Called once by the embedding crate before the host's first
/// [`rdp_connect`].
///
/// # Errors
///
/// [`ClientError::Usage`] if a connector is already installed or `config`
/// is invalid, [`ClientError::Runtime`] if the runtime cannot start.
pub fn install_connector(
    connector: Arc<dyn EngineConnector>,
    config: &ClientConfig,
) -> Result<(), ClientError> {
    if CLIENT.get().is_some() {
        return Err(already_installed());
    }
    let client = RdpClient::new(config, connector)?;
    CLIENT.set(client).map_err(|_| already_installed())?;
    info!("engine connector installed");
    Ok(())
}

fn already_installed() -> ClientError {
    ClientError::Usage("an engine connector is already installed".to_string())
}

fn client() -> Result<&'static RdpClient, ClientError> {
    CLIENT
        .get()
        .ok_or_else(|| ClientError::Usage("no engine connector installed".to_string()))
}

fn callbacks() -> Result<HostCallbacks, ClientError> {
    let registered = *CALLBACKS.read().unwrap_or_else(PoisonError::into_inner);
    registered.ok_or_else(|| ClientError::Usage("host callbacks are not registered".to_string()))
}

fn resolve(handle: u64) -> Result<SessionHandle, ClientError> {
    SessionHandle::from_raw(handle).ok_or_else(ClientError::stale_handle)
}

/// Runs `body`, turning a panic into a usage error.
fn guarded<T>(
    operation: &'static str,
    body: impl FnOnce() -> Result<T, ClientError>,
) -> Result<T, ClientError> {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        error!(operation, "panic caught at the C boundary");
        Err(ClientError::Usage(format!("internal panic during {operation}")))
    })
}

// ── Exported functions ────────────────────────────────────────────────────────

/// Installs the log subscriber.  Safe to call more than once.
#[no_mangle]
pub extern "C" fn rdp_init() {
    let _ = panic::catch_unwind(|| {
        let level = ClientConfig::load_or_default()
            .map(|cfg| cfg.log_level)
            .unwrap_or_else(|_| "info".to_string());
        if init_logging(&level) {
            info!("rdp client logging initialised");
        }
    });
}

/// Registers the host's tile callback and its string-release function.
///
/// Returns null on success, or an error if either pointer is null.
#[no_mangle]
pub extern "C" fn rdp_register_callbacks(
    deliver_tile: Option<DeliverTileFn>,
    free_host_string: Option<FreeHostStringFn>,
) -> *mut c_char {
    let (Some(deliver_tile), Some(free_host_string)) = (deliver_tile, free_host_string) else {
        return into_c_error(&ClientError::Usage(
            "both host callbacks must be non-null".to_string(),
        ));
    };
    *CALLBACKS.write().unwrap_or_else(PoisonError::into_inner) = Some(HostCallbacks {
        deliver_tile,
        free_host_string,
    });
    std::ptr::null_mut()
}

/// Opens a session.
///
/// # Safety
///
/// `addr`, `username`, and `password` must each be null or a NUL-terminated
/// string valid for the duration of the call.  The host keeps ownership.
#[no_mangle]
pub unsafe extern "C" fn rdp_connect(
    addr: *const c_char,
    username: *const c_char,
    password: *const c_char,
    screen_width: u16,
    screen_height: u16,
) -> HandleOrError {
    let result = guarded("connect", || {
        // SAFETY: forwarded from this function's contract.
        let (addr, username, password) = unsafe {
            (
                copy_c_str(addr, "address")?,
                copy_c_str(username, "username")?,
                Zeroizing::new(copy_c_str(password, "password")?),
            )
        };
        client()?.connect(&addr, &username, &password, screen_width, screen_height)
    });
    match result {
        Ok(handle) => HandleOrError {
            handle: handle.to_raw(),
            err: std::ptr::null_mut(),
        },
        Err(e) => HandleOrError {
            handle: 0,
            err: into_c_error(&e),
        },
    }
}

/// Streams tiles to the registered callback, blocking the calling thread
/// until the session ends, is closed, or fails.
#[no_mangle]
pub extern "C" fn rdp_read_output(handle: u64, client_ref: i64) -> *mut c_char {
    into_c_result(guarded("read_output", || {
        let sink = HostTileSink::new(callbacks()?);
        client()?.stream_output(resolve(handle)?, client_ref, &sink)
    }))
}

/// Injects a pointer event.
#[no_mangle]
pub extern "C" fn rdp_write_pointer(handle: u64, pointer: CPointer) -> *mut c_char {
    into_c_result(guarded("write_pointer", || {
        let button = PointerButton::try_from(pointer.button)
            .map_err(|v| ClientError::Usage(format!("unknown pointer button {v}")))?;
        let event = PointerEvent {
            x: pointer.x,
            y: pointer.y,
            button,
            down: pointer.down,
        };
        client()?.write_pointer(resolve(handle)?, event)
    }))
}

/// Injects a keyboard event.
#[no_mangle]
pub extern "C" fn rdp_write_keyboard(handle: u64, key: CKey) -> *mut c_char {
    into_c_result(guarded("write_keyboard", || {
        let event = KeyboardEvent {
            code: key.code,
            down: key.down,
        };
        client()?.write_keyboard(resolve(handle)?, event)
    }))
}

/// Terminates the session.  Idempotent; a stale handle is an error.
#[no_mangle]
pub extern "C" fn rdp_close(handle: u64) -> *mut c_char {
    into_c_result(guarded("close", || client()?.close(resolve(handle)?)))
}

/// Releases the session.  Stale handles are ignored.
#[no_mangle]
pub extern "C" fn rdp_free(handle: u64) {
    let _ = guarded("free", || {
        if let Some(handle) = SessionHandle::from_raw(handle) {
            client()?.free(handle);
        }
        Ok(())
    });
}

/// Releases an error string returned by this library.
///
/// # Safety
///
/// `s` must be null or a string returned by this library that has not been
/// released yet.
#[no_mangle]
pub unsafe extern "C" fn rdp_free_string(s: *mut c_char) {
    // SAFETY: forwarded from this function's contract.
    unsafe { release_c_string(s) };
}

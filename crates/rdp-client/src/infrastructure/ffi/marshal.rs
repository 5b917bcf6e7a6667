//! Conversions between C values and Rust values.
//!
//! Strings crossing into the library are borrowed: the host keeps ownership
//! and the library copies what it needs before returning.  Strings crossing
//! out are owned by the library until the host hands them back to
//! `rdp_free_string`.

use std::ffi::{c_char, CStr, CString};

use crate::application::error::ClientError;

/// Converts an error into a library-owned C string: `"<kind>: <message>"`.
///
/// Interior NUL bytes cannot be represented and are replaced with spaces.
pub fn into_c_error(err: &ClientError) -> *mut c_char {
    let text = format!("{}: {err}", err.kind().as_str()).replace('\0', " ");
    // Never null, even in the impossible NUL case: null means success.
    CString::new(text).unwrap_or_default().into_raw()
}

/// Null on success, an owned error string otherwise.
pub fn into_c_result(result: Result<(), ClientError>) -> *mut c_char {
    match result {
        Ok(()) => std::ptr::null_mut(),
        Err(e) => into_c_error(&e),
    }
}

/// Copies a borrowed, NUL-terminated UTF-8 string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn copy_c_str(ptr: *const c_char, field: &'static str) -> Result<String, ClientError> {
    if ptr.is_null() {
        return Err(ClientError::Usage(format!("{field} is a null pointer")));
    }
    // SAFETY: non-null, and the caller guarantees NUL termination and validity.
    let borrowed = unsafe { CStr::from_ptr(ptr) };
    borrowed
        .to_str()
        .map(str::to_owned)
        .map_err(|_| ClientError::Usage(format!("{field} is not valid UTF-8")))
}

/// Copies a host-owned message without taking ownership of it.
///
/// # Safety
///
/// `ptr` must be non-null and point to a NUL-terminated string.
pub unsafe fn copy_host_message(ptr: *const c_char) -> String {
    // SAFETY: upheld by the caller.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Releases a string produced by [`into_c_error`].
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`into_c_error`] that has not
/// been released yet.
pub unsafe fn release_c_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: the pointer came from `CString::into_raw` and is released once.
    drop(unsafe { CString::from_raw(ptr) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_null() {
        assert!(into_c_result(Ok(())).is_null());
    }

    #[test]
    fn test_error_string_carries_kind_prefix_and_message() {
        // Arrange
        let err = ClientError::Rejected("x out of range".to_string());

        // Act
        let raw = into_c_error(&err);
        let text = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_owned();
        unsafe { release_c_string(raw) };

        // Assert
        assert_eq!(text, "rejected: input rejected: x out of range");
    }

    #[test]
    fn test_interior_nul_is_replaced() {
        let raw = into_c_error(&ClientError::Callback("bad\0byte".to_string()));
        let text = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_owned();
        unsafe { release_c_string(raw) };
        assert_eq!(text, "callback: tile callback failed: bad byte");
    }

    #[test]
    fn test_copy_c_str_rejects_null() {
        let err = unsafe { copy_c_str(std::ptr::null(), "address") }.unwrap_err();
        assert_eq!(err, ClientError::Usage("address is a null pointer".to_string()));
    }

    #[test]
    fn test_copy_c_str_rejects_invalid_utf8() {
        let bytes = [0xFFu8, 0xFE, 0x00];
        let err = unsafe { copy_c_str(bytes.as_ptr().cast(), "username") }.unwrap_err();
        assert!(matches!(err, ClientError::Usage(_)));
    }

    #[test]
    fn test_copy_c_str_copies_text() {
        let owned = CString::new("10.0.0.5:3389").unwrap();
        let copied = unsafe { copy_c_str(owned.as_ptr(), "address") }.unwrap();
        assert_eq!(copied, "10.0.0.5:3389");
    }

    #[test]
    fn test_release_null_is_noop() {
        unsafe { release_c_string(std::ptr::null_mut()) };
    }
}

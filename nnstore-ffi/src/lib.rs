//! C FFI bindings for nnstore
//!
//! A C-compatible, opaque-handle API over the `nnstore-core` engine:
//! create a handle, drive it through the data-source / generative-data /
//! generative-model operations, free the handle. Complex values cross
//! the boundary as JSON strings; errors are integer codes plus a
//! thread-local diagnostic message.

#![deny(missing_docs)]
#![allow(clippy::missing_safety_doc)]
#![allow(non_camel_case_types)]

mod engine;
mod error;
mod progress;
#[allow(missing_docs)] // one constant per spec.md §7 error kind; names are self-documenting
mod types;
mod utils;

pub use engine::*;
pub use error::nnstore_error_message;
pub use progress::{nnstore_progress_t, nnstore_progress_update_fn};
pub use types::*;

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

/// Initialize the nnstore library: sets up `env_logger` from the host
/// process's environment (`RUST_LOG`) and starts the background Tokio
/// runtime used by [`nnstore_gm_read`].
///
/// Safe to call more than once; later calls are no-ops.
#[no_mangle]
pub extern "C" fn nnstore_init() -> c_int {
    let _ = env_logger::try_init();
    match utils::get_or_create_runtime() {
        Ok(_) => {
            log::debug!("nnstore runtime initialized");
            NNSTORE_OK
        }
        Err(e) => {
            log::error!("failed to start nnstore runtime: {e}");
            NNSTORE_ERROR_INIT
        }
    }
}

/// No-op placeholder for symmetry with [`nnstore_init`]; the background
/// runtime is process-lifetime and has no explicit teardown.
#[no_mangle]
pub extern "C" fn nnstore_cleanup() {}

/// Get the version string of nnstore.
///
/// Returns a null-terminated string; the caller must not free it.
#[no_mangle]
pub extern "C" fn nnstore_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

/// Free a string returned by an nnstore function.
///
/// # Safety
/// Only call this on strings returned by nnstore functions that
/// explicitly document that the caller owns the result (the `*_get_*`
/// and `*_json` out-parameters). `str_ptr` becomes invalid after this
/// call.
#[no_mangle]
pub unsafe extern "C" fn nnstore_string_free(str_ptr: *mut c_char) {
    if !str_ptr.is_null() {
        let _ = CString::from_raw(str_ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn json_cstring<T: serde::Serialize>(value: &T) -> CString {
        CString::new(serde_json::to_string(value).unwrap()).unwrap()
    }

    #[test]
    fn create_read_write_row_round_trip() {
        unsafe {
            let handle = nnstore_engine_create(std::ptr::null());
            assert!(!handle.is_null());

            let types = [1i32, 1i32]; // NUMERICAL, NUMERICAL
            let name_a = CString::new("x").unwrap();
            let name_b = CString::new("y").unwrap();
            let names = [name_a.as_ptr(), name_b.as_ptr()];
            let rc = nnstore_ds_create(handle, types.as_ptr(), names.as_ptr(), 2);
            assert_eq!(rc, NNSTORE_OK);

            let row = json_cstring(&vec!["1.0".to_string(), "2.0".to_string()]);
            let rc = nnstore_ds_add_value_row(handle, row.as_ptr());
            assert_eq!(rc, NNSTORE_OK);

            let mut count: usize = 0;
            let rc = nnstore_ds_get_number_of_rows(handle, &mut count);
            assert_eq!(rc, NNSTORE_OK);
            assert_eq!(count, 1);

            let mut out: *mut c_char = std::ptr::null_mut();
            let rc = nnstore_ds_get_row(handle, 0, &mut out);
            assert_eq!(rc, NNSTORE_OK);
            assert!(!out.is_null());
            let row_back: Vec<String> =
                serde_json::from_str(std::ffi::CStr::from_ptr(out).to_str().unwrap()).unwrap();
            assert_eq!(row_back, vec!["1".to_string(), "2".to_string()]);
            nnstore_string_free(out);

            nnstore_engine_free(handle);
        }
    }

    #[test]
    fn null_engine_returns_null_pointer_error() {
        unsafe {
            let mut out: usize = 0;
            let rc = nnstore_ds_get_number_of_rows(std::ptr::null_mut(), &mut out);
            assert_eq!(rc, NNSTORE_ERROR_NULL_POINTER);
        }
    }

    #[test]
    fn missing_data_source_reports_state_missing() {
        unsafe {
            let handle = nnstore_engine_create(std::ptr::null());
            let mut out: usize = 0;
            let rc = nnstore_ds_get_number_of_rows(handle, &mut out);
            assert_eq!(rc, NNSTORE_ERROR_STATE_MISSING);
            assert!(!nnstore_error_message().is_null());
            nnstore_engine_free(handle);
        }
    }
}

//! Last-error-message plumbing. Every fallible entry point stores its
//! error's display text here before returning an integer code, mirroring
//! `errno`: the message is valid until the next call on the same thread.

use crate::types::*;
use nnstore_core::Error as CoreError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

pub(crate) fn set_last_error(message: impl Into<String>) {
    let c_string = CString::new(message.into()).unwrap_or_else(|_| {
        CString::new("error message contained an interior NUL").unwrap()
    });
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(c_string));
}

/// Get the last error message set on the calling thread.
///
/// Returns a null-terminated string valid until the next nnstore call on
/// this thread, or NULL if no error has been recorded yet. The caller
/// must not free the returned pointer.
#[no_mangle]
pub extern "C" fn nnstore_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(c_string) => c_string.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Map a core error to its integer code, recording its display text as
/// the thread's last error.
pub(crate) fn report(error: CoreError) -> c_int {
    let code = error_code(&error);
    set_last_error(error.to_string());
    code
}

fn error_code(error: &CoreError) -> c_int {
    match error {
        CoreError::StateMissing(_) => NNSTORE_ERROR_STATE_MISSING,
        CoreError::InvalidColumnType(_) => NNSTORE_ERROR_INVALID_COLUMN_TYPE,
        CoreError::InvalidScaleType(_) => NNSTORE_ERROR_INVALID_SCALE_TYPE,
        CoreError::OutOfRange(_) => NNSTORE_ERROR_OUT_OF_RANGE,
        CoreError::InvalidColumnIndex(_) => NNSTORE_ERROR_INVALID_COLUMN_INDEX,
        CoreError::InvalidIndex(_) => NNSTORE_ERROR_INVALID_INDEX,
        CoreError::ParseError { .. } => NNSTORE_ERROR_PARSE,
        CoreError::InvalidDimension { .. } => NNSTORE_ERROR_INVALID_DIMENSION,
        CoreError::InvalidVectorSize(_) => NNSTORE_ERROR_INVALID_VECTOR_SIZE,
        CoreError::NotNormalized => NNSTORE_ERROR_NOT_NORMALIZED,
        CoreError::NoDensities => NNSTORE_ERROR_NO_DENSITIES,
        CoreError::InvalidTypeId { .. } => NNSTORE_ERROR_INVALID_TYPE_ID,
        CoreError::Io(_) => NNSTORE_ERROR_IO,
        CoreError::InvalidDensity(_) => NNSTORE_ERROR_INVALID_DENSITY,
        CoreError::DifferentSizes(_) => NNSTORE_ERROR_DIFFERENT_SIZES,
        CoreError::NearestNeighborDifferent(_) => NNSTORE_ERROR_NEAREST_NEIGHBOR_DIFFERENT,
        CoreError::InvalidOperation(_) => NNSTORE_ERROR_INVALID_OPERATION,
    }
}

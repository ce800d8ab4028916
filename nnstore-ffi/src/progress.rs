//! Bridges a C callback pair into the core's [`Progress`] trait, per the
//! engine's observability hook design: the host supplies an optional
//! sink, the core never assumes a terminal or UI toolkit exists.

use nnstore_core::platform::{NullProgress, Progress, ProgressSignal};
use std::os::raw::{c_int, c_void};

/// Called after each item completes. Return 0 to continue, non-zero to
/// abort the operation.
pub type nnstore_progress_update_fn =
    extern "C" fn(current: usize, total: usize, user_data: *mut c_void) -> c_int;

/// A C callback pair: an `update` function pointer plus opaque user data,
/// handed in by reference to long-running engine operations.
#[repr(C)]
pub struct nnstore_progress_t {
    /// Called after each item; NULL disables progress reporting entirely.
    pub update: Option<nnstore_progress_update_fn>,
    /// Opaque pointer passed back unchanged to every `update` call.
    pub user_data: *mut c_void,
}

struct CProgress {
    update: nnstore_progress_update_fn,
    user_data: *mut c_void,
}

// The host-supplied function pointer and user_data are only ever invoked
// from the single thread driving the engine call that owns this sink;
// nnstore never calls into it concurrently or after the call returns.
unsafe impl Send for CProgress {}
unsafe impl Sync for CProgress {}

impl Progress for CProgress {
    fn update(&self, current: usize, total: usize) -> ProgressSignal {
        let signal = (self.update)(current, total, self.user_data);
        if signal == 0 {
            ProgressSignal::Continue
        } else {
            ProgressSignal::Abort
        }
    }
}

/// Resolve a caller-supplied (possibly null) progress struct pointer into
/// a boxed [`Progress`] implementation, defaulting to [`NullProgress`].
///
/// # Safety
/// `ptr`, if non-null, must point to a live, readable `nnstore_progress_t`
/// for the duration of this call.
pub(crate) unsafe fn resolve(ptr: *const nnstore_progress_t) -> Box<dyn Progress> {
    if ptr.is_null() {
        return Box::new(NullProgress);
    }
    match (*ptr).update {
        Some(update) => Box::new(CProgress {
            update,
            user_data: (*ptr).user_data,
        }),
        None => Box::new(NullProgress),
    }
}

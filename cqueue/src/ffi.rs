//! C entry points.
//!
//! Every function takes an explicit handle created by the matching `*_new`
//! function. A queue handle may be shared by exactly one producer thread
//! calling [`cqueue_enqueue`] and one consumer thread calling
//! [`cqueue_dequeue`]; two concurrent producers or two concurrent consumers
//! are undefined behavior and are not detected.

use std::ffi::c_void;

use crate::cell::VariableCell;
use crate::queue::{BoundedQueue, DEFAULT_CAPACITY};

pub type CQueue = BoundedQueue<i32, DEFAULT_CAPACITY>;
pub type CVariableStore = VariableCell<i32>;

#[unsafe(no_mangle)]
pub extern "C" fn cqueue_new() -> *mut CQueue {
    let q = Box::into_raw(Box::new(CQueue::new()));
    tracing::trace!("allocated queue, addr={q:p}, size={DEFAULT_CAPACITY}");
    q
}

/// # Safety
///
/// `q` must be null or a live handle from [`cqueue_new`] that no other thread
/// is using.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqueue_free(q: *mut CQueue) {
    if q.is_null() {
        return;
    }
    tracing::trace!("freed queue, addr={q:p}");
    drop(unsafe { Box::from_raw(q) });
}

/// # Safety
///
/// `q` must be a live handle, and neither role may be running.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqueue_reset(q: *const CQueue) {
    unsafe { (*q).reset_unchecked() }
}

/// Returns `false` if the queue is full.
///
/// # Safety
///
/// `q` must be a live handle, and no other thread may be enqueuing.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqueue_enqueue(q: *const CQueue, value: i32) -> bool {
    unsafe { (*q).enqueue_unchecked(value).is_ok() }
}

/// Returns `false` if the queue is empty, in which case `out` is left as is.
///
/// # Safety
///
/// `q` must be a live handle, `out` must be valid for writes, and no other
/// thread may be dequeuing.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cqueue_dequeue(q: *const CQueue, out: *mut i32) -> bool {
    match unsafe { (*q).dequeue_unchecked() } {
        Some(val) => {
            unsafe { out.write(val) };
            true
        },
        None => false,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn variable_store_new() -> *mut CVariableStore {
    Box::into_raw(Box::new(CVariableStore::new()))
}

/// # Safety
///
/// `s` must be null or a live handle from [`variable_store_new`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn variable_store_free(s: *mut CVariableStore) {
    if !s.is_null() {
        drop(unsafe { Box::from_raw(s) });
    }
}

/// # Safety
///
/// `s` must be a live handle with no concurrent access.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn variable_store_init(s: *const CVariableStore) {
    unsafe { (*s).init() }
}

/// # Safety
///
/// `s` must be a live handle with no concurrent access.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn variable_store_set(s: *const CVariableStore, value: i32) {
    unsafe { (*s).set(value) }
}

/// # Safety
///
/// `s` must be a live handle with no concurrent access.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn variable_store_get(s: *const CVariableStore) -> i32 {
    unsafe { (*s).get() }
}

#[unsafe(no_mangle)]
pub extern "C" fn pointer_to_u64(ptr: *mut c_void) -> u64 {
    ptr.expose_provenance() as u64
}

#[unsafe(no_mangle)]
pub extern "C" fn u64_to_pointer(value: u64) -> *mut c_void {
    std::ptr::with_exposed_provenance_mut(value as usize)
}

//! The task allocator.
//!
//! Buffers that cross the boundary as return values are allocated with [`alloc_array`] by the
//! side that produces them and released with [`free`] by the side that receives them. The
//! allocator is process-wide: a buffer may be freed on another thread than the one that
//! allocated it. It remembers the layout of every live allocation, freeing a pointer it doesn't
//! know is reported as `E_INVALIDARG` instead of corrupting the heap.

use std::{
    alloc::{self, Layout},
    ffi::c_void,
    ptr,
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::{
    HResult,
    fault::{self, NativeOp},
};
use crate::memory::ledger;

static LIVE: Lazy<Mutex<FxHashMap<usize, Layout>>> = Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Allocate a zero-initialized buffer for `len` elements of type `A`.
///
/// If no memory is needed, because `len` is 0 or `A` is zero-sized, a null pointer is returned.
/// Buffers must be released with [`free`], which can happen on any thread.
pub fn alloc_array<A>(len: usize) -> Result<*mut A, HResult> {
    fault::check(NativeOp::Alloc)?;

    let layout = Layout::array::<A>(len).map_err(|_| HResult::E_OUTOFMEMORY)?;
    if layout.size() == 0 {
        return Ok(ptr::null_mut());
    }

    // Safety: the layout has a non-zero size.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(HResult::E_OUTOFMEMORY);
    }

    LIVE.lock().insert(ptr as usize, layout);
    ledger::record(|l| l.native_allocations += 1);
    trace!(ptr = ?ptr, bytes = layout.size(), "task allocation");
    Ok(ptr.cast())
}

/// Free a buffer allocated with [`alloc_array`].
///
/// Freeing a null pointer does nothing.
///
/// Safety: the buffer must not be used after it has been freed.
pub unsafe fn free(ptr: *mut c_void) -> HResult {
    if ptr.is_null() {
        return HResult::S_OK;
    }

    let Some(layout) = LIVE.lock().remove(&(ptr as usize)) else {
        return HResult::E_INVALIDARG;
    };

    // Safety: the pointer was allocated with this layout and hasn't been freed yet.
    unsafe { alloc::dealloc(ptr.cast(), layout) };
    ledger::record(|l| l.native_allocations = l.native_allocations.saturating_sub(1));
    trace!(ptr = ?ptr, bytes = layout.size(), "task free");
    HResult::S_OK
}

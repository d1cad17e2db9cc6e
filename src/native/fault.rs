//! Inject failures into native operations.
//!
//! A planned failure is armed per thread: after `n` successful calls of the chosen operation the
//! next call fails with `E_OUTOFMEMORY`, after which the plan is cleared. This makes it possible
//! to fail the `k`-th step of a composite or array build and check that everything built before
//! it has been released.

use std::cell::Cell;

use super::HResult;

/// Native operations that can be made to fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeOp {
    /// Creating a reference string.
    StringReference,
    /// Allocating an owned string.
    StringAlloc,
    /// Allocating a buffer with the task allocator.
    Alloc,
}

thread_local! {
    static PLAN: Cell<Option<(NativeOp, usize)>> = const { Cell::new(None) };
}

/// Let the call of `op` that follows `n` successful calls fail on the current thread.
pub fn fail_nth(op: NativeOp, n: usize) {
    PLAN.with(|plan| plan.set(Some((op, n))));
}

/// Remove the planned failure of the current thread, if any.
pub fn clear() {
    PLAN.with(|plan| plan.set(None));
}

/// Returns `true` if a failure is still planned on the current thread.
pub fn is_armed() -> bool {
    PLAN.with(|plan| plan.get().is_some())
}

pub(crate) fn check(op: NativeOp) -> Result<(), HResult> {
    PLAN.with(|plan| match plan.get() {
        Some((planned, 0)) if planned == op => {
            plan.set(None);
            Err(HResult::E_OUTOFMEMORY)
        }
        Some((planned, n)) if planned == op => {
            plan.set(Some((planned, n - 1)));
            Ok(())
        }
        _ => Ok(()),
    })
}

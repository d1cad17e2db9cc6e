//! The native side of the boundary.
//!
//! Native strings and the task allocator are owned by the host platform. This module provides an
//! in-process implementation of both that follows the host ABI, so marshaled values can be handed
//! to real native callees and to callees written in Rust alike. Every native resource is recorded
//! in the per-thread [`ResourceLedger`].
//!
//! [`ResourceLedger`]: crate::memory::ledger::ResourceLedger

pub mod alloc;
#[cfg(any(test, feature = "fault-injection"))]
pub mod fault;
pub mod string;

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Status code returned by native functions.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E_u32 as i32);
    pub const E_INVALIDARG: HResult = HResult(0x8007_0057_u32 as i32);
    pub const E_BOUNDS: HResult = HResult(0x8000_000B_u32 as i32);

    /// Returns `true` if this code indicates success.
    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Convert the code to a `Result`.
    #[inline]
    pub const fn ok(self) -> Result<(), HResult> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

impl Display for HResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "HRESULT 0x{:08X}", self.0 as u32)
    }
}

impl Debug for HResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

#[cfg(not(any(test, feature = "fault-injection")))]
pub(crate) mod fault {
    #[derive(Copy, Clone)]
    pub(crate) enum NativeOp {
        StringReference,
        StringAlloc,
        Alloc,
    }

    #[inline(always)]
    pub(crate) fn check(_op: NativeOp) -> Result<(), super::HResult> {
        Ok(())
    }
}

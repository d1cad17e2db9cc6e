//! Opaque handles.
//!
//! Interfaces, callbacks and other references whose lifetime is managed by another layer are
//! passed through the boundary as a single pointer-sized handle. Marshaling never adds or
//! removes a reference, the handle is copied as is.

use std::{ffi::c_void, ptr};

/// The native form of an opaque handle.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawHandle(pub *mut c_void);

impl RawHandle {
    #[inline]
    pub const fn null() -> Self {
        RawHandle(ptr::null_mut())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for RawHandle {
    #[inline]
    fn default() -> Self {
        RawHandle::null()
    }
}

/// Types that are passed through the boundary as an opaque handle.
///
/// Implement this trait and use [`impl_opaque_handle`] to make a type marshalable.
///
/// Safety: `from_raw(x.as_raw())` must be equivalent to `x`, and the implementor must not
/// expect marshaling to manage the lifetime of the referenced object.
///
/// [`impl_opaque_handle`]: crate::impl_opaque_handle
pub unsafe trait OpaqueHandle: Sized {
    /// The raw handle.
    fn as_raw(&self) -> RawHandle;

    /// Wrap a raw handle.
    ///
    /// Safety: `raw` must be a handle of the right kind, or null.
    unsafe fn from_raw(raw: RawHandle) -> Self;
}

/// A handle to an object whose lifetime is managed elsewhere.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectHandle(RawHandle);

impl ObjectHandle {
    #[inline]
    pub const fn null() -> Self {
        ObjectHandle(RawHandle::null())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

unsafe impl OpaqueHandle for ObjectHandle {
    #[inline]
    fn as_raw(&self) -> RawHandle {
        self.0
    }

    #[inline]
    unsafe fn from_raw(raw: RawHandle) -> Self {
        ObjectHandle(raw)
    }
}

//! Native string handles.
//!
//! A native string is identified by an [`HString`], a pointer to a fixed-size [`HStringHeader`].
//! The null handle is the empty string. Two kinds of strings exist:
//!
//! - reference strings, created with [`create_string_reference`], wrap a buffer owned by the
//!   caller without copying it. The header is provided by the caller too and must not move while
//!   the handle is in use. Deleting a reference string is a no-op.
//! - owned strings, created with [`create_string`], copy their contents into storage owned by the
//!   native side. Whoever receives an owned string must delete it with [`delete_string`].
//!
//! Text is carried as UTF-8.

use std::{mem, ptr};

use tracing::trace;

use super::{
    HResult,
    fault::{self, NativeOp},
};
use crate::memory::ledger;

const MAGIC: u32 = 0x4853_0000;
const MAGIC_MASK: u32 = 0xFFFF_0000;
const FLAG_REFERENCE: u32 = 0x1;
const FLAG_OWNED: u32 = 0x2;

/// Storage for the header of a native string.
///
/// The layout is opaque, only its size and alignment are part of the ABI.
#[repr(C)]
#[derive(Debug, Default)]
pub struct HStringHeader {
    reserved: [usize; 3],
}

/// A native string handle.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HString(*mut HStringHeader);

impl HString {
    /// The null handle, which represents the empty string.
    #[inline]
    pub const fn null() -> Self {
        HString(ptr::null_mut())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    #[inline]
    pub fn as_raw(self) -> *mut HStringHeader {
        self.0
    }

    /// Wrap a raw header pointer.
    ///
    /// Safety: `raw` must be null or point to the header of a live native string.
    #[inline]
    pub unsafe fn from_raw(raw: *mut HStringHeader) -> Self {
        HString(raw)
    }
}

impl Default for HString {
    #[inline]
    fn default() -> Self {
        HString::null()
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
struct HeaderView {
    flags: u32,
    length: u32,
    buffer: *const u8,
}

const _: () = {
    assert!(mem::size_of::<HeaderView>() <= mem::size_of::<HStringHeader>());
    assert!(mem::align_of::<HeaderView>() <= mem::align_of::<HStringHeader>());
};

#[repr(C)]
struct OwnedString {
    header: HStringHeader,
    data: Box<[u8]>,
}

#[inline]
unsafe fn write_view(header: *mut HStringHeader, view: HeaderView) {
    unsafe { header.cast::<HeaderView>().write(view) }
}

#[inline]
unsafe fn read_view(handle: HString) -> Result<HeaderView, HResult> {
    let view = unsafe { handle.0.cast::<HeaderView>().read() };
    if view.flags & MAGIC_MASK != MAGIC {
        return Err(HResult::E_INVALIDARG);
    }

    Ok(view)
}

/// Create a reference string over `len` bytes at `data`, using `header` as its header.
///
/// An empty string results in the null handle.
///
/// Safety: `data` must be valid for reads of `len` bytes, `header` and `out` must be valid for
/// writes. Both `data` and `header` must stay alive and at a fixed address as long as the handle
/// is in use.
pub unsafe fn create_string_reference(
    data: *const u8,
    len: usize,
    header: *mut HStringHeader,
    out: *mut HString,
) -> HResult {
    if let Err(hr) = fault::check(NativeOp::StringReference) {
        return hr;
    }

    let Ok(length) = u32::try_from(len) else {
        return HResult::E_INVALIDARG;
    };

    if length == 0 {
        unsafe { out.write(HString::null()) };
        return HResult::S_OK;
    }

    if data.is_null() {
        return HResult::E_INVALIDARG;
    }

    unsafe {
        write_view(
            header,
            HeaderView {
                flags: MAGIC | FLAG_REFERENCE,
                length,
                buffer: data,
            },
        );
        out.write(HString(header));
    }

    HResult::S_OK
}

/// Create an owned string that contains a copy of `contents`.
///
/// An empty string results in the null handle. The returned handle must be deleted with
/// [`delete_string`].
pub fn create_string(contents: &[u8]) -> Result<HString, HResult> {
    fault::check(NativeOp::StringAlloc)?;

    let length = u32::try_from(contents.len()).map_err(|_| HResult::E_INVALIDARG)?;
    if length == 0 {
        return Ok(HString::null());
    }

    let data: Box<[u8]> = contents.into();
    let mut owned = Box::new(OwnedString {
        header: HStringHeader::default(),
        data,
    });

    let view = HeaderView {
        flags: MAGIC | FLAG_OWNED,
        length,
        buffer: owned.data.as_ptr(),
    };

    unsafe { write_view(&mut owned.header, view) };

    let raw = Box::into_raw(owned).cast::<HStringHeader>();
    ledger::record(|l| l.owned_strings += 1);
    trace!(handle = ?raw, length, "created owned native string");
    Ok(HString(raw))
}

/// Returns a pointer to the contents of a string and its length in bytes.
///
/// The null handle results in a null pointer and a length of 0.
///
/// Safety: `handle` must be null or point to memory that is valid for reads of the size of
/// [`HStringHeader`].
pub unsafe fn string_raw_buffer(handle: HString) -> Result<(*const u8, u32), HResult> {
    if handle.is_null() {
        return Ok((ptr::null(), 0));
    }

    let view = unsafe { read_view(handle)? };
    Ok((view.buffer, view.length))
}

/// Delete a string.
///
/// Deleting the null handle or a reference string does nothing.
///
/// Safety: `handle` must be null or point to memory that is valid for reads of the size of
/// [`HStringHeader`]. An owned string must not be used after it has been deleted.
pub unsafe fn delete_string(handle: HString) -> HResult {
    if handle.is_null() {
        return HResult::S_OK;
    }

    let view = match unsafe { read_view(handle) } {
        Ok(view) => view,
        Err(hr) => return hr,
    };

    if view.flags & FLAG_OWNED == 0 {
        return HResult::S_OK;
    }

    unsafe {
        write_view(
            handle.0,
            HeaderView {
                flags: 0,
                length: 0,
                buffer: ptr::null(),
            },
        );
        drop(Box::from_raw(handle.0.cast::<OwnedString>()));
    }

    ledger::record(|l| l.owned_strings = l.owned_strings.saturating_sub(1));
    trace!(handle = ?handle.0, "deleted owned native string");
    HResult::S_OK
}

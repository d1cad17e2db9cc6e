//! Marshaling text.
//!
//! Outbound, a `String` is converted to a reference string that points directly to its UTF-8
//! contents: the buffer is pinned for the duration of the call and nothing is copied. Releasing
//! the cache deletes the reference and unpins the buffer, the buffer itself is never freed.
//!
//! Inbound, the contents of a native string are always copied to a new `String`. A string
//! returned by a native function is owned by the caller and must be released with
//! [`Marshal::release_abi`], which deletes it.

use std::slice;

use tracing::{trace, warn};

use crate::{
    config::{Utf8Policy, config},
    convert::marshal::Marshal,
    data::shape::TypeShape,
    error::{ConstructionError, ConversionError, MarshalResult},
    memory::{
        cache::{Cache, Resources, Slot},
        ledger,
        pin::Pinned,
    },
    native::string::{
        HString, HStringHeader, create_string, create_string_reference, delete_string,
        string_raw_buffer,
    },
};

/// A reference string and the header it lives in.
///
/// The header is boxed so it stays at the same address when the reference is moved.
#[derive(Debug)]
pub struct StringReference {
    header: Box<HStringHeader>,
    handle: HString,
}

impl StringReference {
    /// Create a reference string over `len` bytes at `data`.
    ///
    /// Safety: `data` must be valid for reads of `len` bytes for as long as the returned
    /// reference exists.
    pub(crate) unsafe fn new(data: *const u8, len: usize) -> MarshalResult<Self> {
        let mut header = Box::new(HStringHeader::default());
        let mut handle = HString::null();

        let hr = unsafe { create_string_reference(data, len, &mut *header, &mut handle) };
        if let Err(hr) = hr.ok() {
            Err(ConstructionError::Native {
                operation: "create_string_reference",
                hr,
            })?
        }

        ledger::record(|l| l.string_references += 1);
        trace!(handle = ?handle, len, "create string reference");
        Ok(StringReference { header, handle })
    }

    /// The native handle of this string.
    #[inline]
    pub fn handle(&self) -> HString {
        self.handle
    }
}

impl Drop for StringReference {
    fn drop(&mut self) {
        // Reference strings don't own their contents, deleting them only invalidates the header.
        let hr = unsafe { delete_string(self.handle) };
        if !hr.is_ok() {
            warn!(handle = ?self.handle, %hr, "failed to delete string reference");
        }

        *self.header = HStringHeader::default();
        ledger::record(|l| {
            l.string_references = l.string_references.saturating_sub(1);
            l.string_references_released += 1;
        });
        trace!(handle = ?self.handle, "release string reference");
    }
}

#[inline]
fn check_len(len: usize) -> MarshalResult<()> {
    if len > u32::MAX as usize {
        Err(ConstructionError::StringTooLong { len })?
    }

    Ok(())
}

unsafe impl Marshal for String {
    type Abi = HString;

    #[inline]
    fn shape() -> TypeShape {
        TypeShape::Text
    }

    fn create_cache(&self) -> MarshalResult<Cache<'_, HString>> {
        let bytes = self.as_bytes();
        check_len(bytes.len())?;

        let pin = Pinned::new(bytes);
        // Safety: the buffer is pinned for as long as the reference exists.
        let reference = unsafe { StringReference::new(pin.addr(), pin.len())? };
        let handle = reference.handle();

        let mut resources = Resources::default();
        resources.push(Slot::String(reference));
        resources.push(Slot::Pin(pin));
        Ok(Cache::new(handle, resources))
    }

    unsafe fn from_abi(abi: HString) -> MarshalResult<Self> {
        let Ok((data, len)) = (unsafe { string_raw_buffer(abi) }) else {
            return Err(ConversionError::InvalidHandle.into());
        };

        if len == 0 {
            return Ok(String::new());
        }

        if data.is_null() {
            Err(ConversionError::InvalidHandle)?
        }

        let bytes = unsafe { slice::from_raw_parts(data, len as usize) };
        match config().utf8_policy {
            Utf8Policy::Strict => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(s.to_owned()),
                Err(_) => Err(ConversionError::InvalidUtf8.into()),
            },
            Utf8Policy::Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    unsafe fn release_abi(abi: HString) {
        let hr = unsafe { delete_string(abi) };
        if !hr.is_ok() {
            warn!(handle = ?abi, %hr, "failed to delete returned string");
        }
    }

    fn into_abi(&self) -> MarshalResult<HString> {
        check_len(self.len())?;
        match create_string(self.as_bytes()) {
            Ok(handle) => Ok(handle),
            Err(hr) => Err(ConstructionError::Native {
                operation: "create_string",
                hr,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::ledger::ResourceLedger,
        native::fault::{self, NativeOp},
    };

    #[test]
    fn hello_round_trips_without_copy() {
        let before = ResourceLedger::snapshot();
        let text = String::from("hello");

        let cache = text.create_cache().unwrap();
        let (data, len) = unsafe { string_raw_buffer(cache.abi()).unwrap() };
        assert_eq!(data, text.as_ptr());
        assert_eq!(len, 5);
        assert_eq!(unsafe { String::from_abi(cache.abi()) }.unwrap(), "hello");

        cache.release();
        let after = ResourceLedger::snapshot();
        assert!(after.same_live(&before));
        assert_eq!(after.pins_released, before.pins_released + 1);
        assert_eq!(after.string_references_released, before.string_references_released + 1);
        assert_eq!(text, "hello");
    }

    #[test]
    fn empty_string_is_null_handle() {
        let text = String::new();
        let cache = text.create_cache().unwrap();
        assert!(cache.abi().is_null());
        assert_eq!(unsafe { String::from_abi(cache.abi()) }.unwrap(), "");
    }

    #[test]
    fn failed_reference_unpins() {
        let before = ResourceLedger::snapshot();
        let text = String::from("abc");

        fault::fail_nth(NativeOp::StringReference, 0);
        let err = text.create_cache().unwrap_err();
        assert!(err.is_construction());

        let after = ResourceLedger::snapshot();
        assert!(after.same_live(&before));
        assert_eq!(after.pins_released, before.pins_released + 1);
        assert_eq!(after.string_references_released, before.string_references_released);
    }

    #[test]
    fn owned_string_is_released() {
        let before = ResourceLedger::snapshot();
        let abi = String::from("returned").into_abi().unwrap();
        assert_eq!(ResourceLedger::snapshot().owned_strings, before.owned_strings + 1);
        assert_eq!(unsafe { String::from_abi(abi) }.unwrap(), "returned");
        unsafe { String::release_abi(abi) };
        assert_eq!(ResourceLedger::snapshot(), before);
    }

    #[test]
    fn invalid_handle_is_conversion_error() {
        let mut header = HStringHeader::default();
        let handle = unsafe { HString::from_raw(&mut header) };
        let err = unsafe { String::from_abi(handle) }.unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn failed_allocation_is_construction_error() {
        fault::fail_nth(NativeOp::StringAlloc, 0);
        let err = String::from("x").into_abi().unwrap_err();
        assert!(err.is_construction());
    }
}

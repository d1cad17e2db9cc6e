//! The native form of an array.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ptr,
};

/// A (pointer, length) pair.
///
/// If the elements are native-compatible, `data` points to the elements of the array itself.
/// Otherwise it points to a block that contains the native form of each element. An empty array
/// can have a null data pointer.
#[repr(C)]
pub struct ArrayAbi<A> {
    pub data: *mut A,
    pub len: u32,
}

impl<A> ArrayAbi<A> {
    #[inline]
    pub const fn new(data: *mut A, len: u32) -> Self {
        ArrayAbi { data, len }
    }

    /// An empty array with a null data pointer.
    #[inline]
    pub const fn empty() -> Self {
        ArrayAbi {
            data: ptr::null_mut(),
            len: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<A> Clone for ArrayAbi<A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for ArrayAbi<A> {}

impl<A> Default for ArrayAbi<A> {
    #[inline]
    fn default() -> Self {
        ArrayAbi::empty()
    }
}

impl<A> PartialEq for ArrayAbi<A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.len == other.len
    }
}

impl<A> Eq for ArrayAbi<A> {}

impl<A> Debug for ArrayAbi<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ArrayAbi")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

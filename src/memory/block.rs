//! Native-layout blocks.
//!
//! When the elements of an array need conversion, their native forms are written to a block
//! that is owned by the cache of the array. The block is zero-initialized so that releasing a
//! block whose elements have only partially been written is safe.

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
};

use tracing::trace;

use super::ledger;
use crate::error::{ConstructionError, MarshalResult};

/// An owned, zero-initialized buffer for a number of native-form elements.
#[derive(Debug)]
pub struct NativeBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl NativeBlock {
    /// Allocate a block for `len` elements of type `A`.
    pub fn new<A>(len: usize) -> MarshalResult<Self> {
        let Ok(layout) = Layout::array::<A>(len) else {
            return Err(ConstructionError::ArrayTooLong { len }.into());
        };

        let ptr = if layout.size() == 0 {
            NonNull::<A>::dangling().cast()
        } else {
            // Safety: the layout has a non-zero size.
            let ptr = unsafe { alloc::alloc_zeroed(layout) };
            match NonNull::new(ptr) {
                Some(ptr) => ptr,
                None => Err(ConstructionError::OutOfMemory {
                    bytes: layout.size(),
                })?,
            }
        };

        ledger::record(|l| l.blocks += 1);
        trace!(ptr = ?ptr, bytes = layout.size(), "allocate block");
        Ok(NativeBlock { ptr, layout })
    }

    /// A pointer to the first element.
    #[inline]
    pub fn as_mut_ptr<A>(&self) -> *mut A {
        self.ptr.as_ptr().cast()
    }

    /// Write `value` to the `index`-th element.
    ///
    /// Safety: the block must have been allocated for at least `index + 1` elements of type `A`.
    #[inline]
    pub unsafe fn write<A>(&mut self, index: usize, value: A) {
        unsafe { self.as_mut_ptr::<A>().add(index).write(value) }
    }
}

impl Drop for NativeBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // Safety: the block was allocated with this layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }

        ledger::record(|l| l.blocks = l.blocks.saturating_sub(1));
        trace!(ptr = ?self.ptr, bytes = self.layout.size(), "free block");
    }
}

//! Marshaling arrays.
//!
//! Arrays are only marshaled at the top level of a call. Two algorithms exist, the registry
//! selects one depending on the element type:
//!
//! - [`block`] is used if the elements are native-compatible. The array is pinned and its own
//!   buffer is used as the native form, converting it back is a single block copy.
//! - [`element`] is used if the elements need conversion. The native form of each element is
//!   written to a separately allocated block, the resources of every element are owned by the
//!   cache of the array.
//!
//! Arrays returned by a native function are owned by the caller. Their buffer has been allocated
//! with the task allocator and is freed by `release_abi`, after the elements have been released.

use tracing::warn;

use crate::{
    config::config,
    data::layout::array::ArrayAbi,
    error::{ConstructionError, ConversionError, MarshalResult},
    native::{
        HResult,
        alloc::{alloc_array, free},
    },
};

fn outbound_len(len: usize) -> MarshalResult<u32> {
    match u32::try_from(len) {
        Ok(len) => Ok(len),
        Err(_) => Err(ConstructionError::ArrayTooLong { len }.into()),
    }
}

fn inbound_len<A>(abi: &ArrayAbi<A>) -> MarshalResult<usize> {
    let len = abi.len as usize;
    let limit = config().max_array_len;
    if len > limit {
        Err(ConversionError::ArrayTooLong { len, limit })?
    }

    if len != 0 && abi.data.is_null() {
        Err(ConversionError::NullData { len: abi.len })?
    }

    Ok(len)
}

fn task_alloc<A>(len: usize) -> MarshalResult<*mut A> {
    match alloc_array::<A>(len) {
        Ok(ptr) => Ok(ptr),
        Err(hr) => Err(ConstructionError::Native {
            operation: "alloc_array",
            hr,
        }
        .into()),
    }
}

unsafe fn task_free<A>(data: *mut A) {
    let hr: HResult = unsafe { free(data.cast()) };
    if !hr.is_ok() {
        warn!(ptr = ?data, %hr, "failed to free returned array");
    }
}

/// Arrays of native-compatible elements.
pub mod block {
    use std::{any::TypeId, mem, ptr};

    use super::{inbound_len, outbound_len, task_alloc, task_free};
    use crate::{
        convert::marshal::Marshal,
        data::layout::array::ArrayAbi,
        error::MarshalResult,
        memory::{
            cache::{Cache, Resources, Slot},
            pin::Pinned,
        },
    };

    #[inline]
    fn debug_assert_same<T: Marshal>() {
        debug_assert_eq!(TypeId::of::<T>(), TypeId::of::<T::Abi>());
        debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<T::Abi>());
    }

    /// Pin `values` and use them as the native form.
    pub fn create_cache<T: Marshal>(values: &[T]) -> MarshalResult<Cache<'_, ArrayAbi<T::Abi>>> {
        debug_assert_same::<T>();
        let len = outbound_len(values.len())?;

        let pin = Pinned::new(values);
        let data = values.as_ptr().cast_mut().cast::<T::Abi>();

        let mut resources = Resources::default();
        resources.push(Slot::Pin(pin));
        Ok(Cache::new(ArrayAbi::new(data, len), resources))
    }

    /// Copy the elements of a native array to a new `Vec`.
    ///
    /// Safety: `abi` must point to `abi.len` initialized elements.
    pub unsafe fn from_abi<T: Marshal>(abi: ArrayAbi<T::Abi>) -> MarshalResult<Vec<T>> {
        debug_assert_same::<T>();
        let len = inbound_len(&abi)?;
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut values = Vec::with_capacity(len);
        unsafe {
            ptr::copy_nonoverlapping(abi.data.cast::<T>().cast_const(), values.as_mut_ptr(), len);
            values.set_len(len);
        }

        Ok(values)
    }

    /// Free an array that is owned by the caller.
    ///
    /// Safety: `abi.data` must have been allocated with the task allocator, or be null.
    pub unsafe fn release_abi<T: Marshal>(abi: ArrayAbi<T::Abi>) {
        unsafe { task_free(abi.data) }
    }

    /// Copy `values` to a buffer allocated with the task allocator.
    pub fn into_abi<T: Marshal>(values: &[T]) -> MarshalResult<ArrayAbi<T::Abi>> {
        debug_assert_same::<T>();
        let len = outbound_len(values.len())?;

        let data = task_alloc::<T::Abi>(values.len())?;
        if !data.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(values.as_ptr().cast::<T::Abi>(), data, values.len())
            };
        }

        Ok(ArrayAbi::new(data, len))
    }
}

/// Arrays of elements that need conversion.
pub mod element {
    use tracing::debug;

    use super::{inbound_len, outbound_len, task_alloc, task_free};
    use crate::{
        convert::marshal::Marshal,
        data::layout::array::ArrayAbi,
        error::MarshalResult,
        memory::{
            block::NativeBlock,
            cache::{Cache, Resources, Slot},
        },
    };

    /// Marshal every element of `values` and write their native forms to a new block.
    ///
    /// If an element fails, the elements before it are released, then the block is freed.
    pub fn create_cache<T: Marshal>(values: &[T]) -> MarshalResult<Cache<'_, ArrayAbi<T::Abi>>> {
        let len = outbound_len(values.len())?;

        // Declared before `resources` so it's dropped after the elements have been released.
        let mut block = NativeBlock::new::<T::Abi>(values.len())?;
        let mut resources = Resources::default();

        for (index, value) in values.iter().enumerate() {
            let cache = match value.create_cache() {
                Ok(cache) => cache,
                Err(e) => {
                    debug!(index, len, "failed to marshal element, releasing elements built so far");
                    return Err(e);
                }
            };

            let (abi, element_resources) = cache.into_parts();
            // Safety: the block has room for `values.len()` elements.
            unsafe { block.write(index, abi) };
            resources.append(element_resources);
        }

        let data = block.as_mut_ptr::<T::Abi>();
        resources.push(Slot::Block(block));
        Ok(Cache::new(ArrayAbi::new(data, len), resources))
    }

    /// Convert the elements of a native array to a new `Vec`.
    ///
    /// Safety: `abi` must point to `abi.len` valid native forms.
    pub unsafe fn from_abi<T: Marshal>(abi: ArrayAbi<T::Abi>) -> MarshalResult<Vec<T>> {
        let len = inbound_len(&abi)?;

        let mut values = Vec::with_capacity(len);
        for index in 0..len {
            let element = unsafe { abi.data.add(index).read() };
            values.push(unsafe { T::from_abi(element)? });
        }

        Ok(values)
    }

    /// Release every element of an array that is owned by the caller, then free the array.
    ///
    /// Safety: `abi` must point to `abi.len` native forms owned by the caller, allocated with
    /// the task allocator, or be null.
    pub unsafe fn release_abi<T: Marshal>(abi: ArrayAbi<T::Abi>) {
        if abi.data.is_null() {
            return;
        }

        for index in 0..abi.len as usize {
            unsafe { T::release_abi(abi.data.add(index).read()) };
        }

        unsafe { task_free(abi.data) }
    }

    /// Convert every element of `values` to an owned native form, in a buffer allocated with the
    /// task allocator.
    pub fn into_abi<T: Marshal>(values: &[T]) -> MarshalResult<ArrayAbi<T::Abi>> {
        let len = outbound_len(values.len())?;

        let data = task_alloc::<T::Abi>(values.len())?;
        for index in 0..values.len() {
            unsafe { data.add(index).write(T::Abi::default()) };
        }

        let abi = ArrayAbi::new(data, len);
        for (index, value) in values.iter().enumerate() {
            match value.into_abi() {
                Ok(element) => unsafe { data.add(index).write(element) },
                Err(e) => {
                    debug!(index, len, "failed to convert element, releasing array");
                    unsafe { release_abi::<T>(abi) };
                    return Err(e);
                }
            }
        }

        Ok(abi)
    }
}

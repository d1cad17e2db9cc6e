//! Marshal values of a type through its classified strategy.
//!
//! [`Marshaler<T>`] is the entry point for generic code: every operation first looks up the
//! strategy of `T`, which classifies `T` on first use, and fails with the cached
//! `ClassificationError` if `T` can't be marshaled.
//!
//! ```
//! use abi_marshal::prelude::*;
//!
//! let text = String::from("hello");
//! let cache = Marshaler::<String>::create_cache(&text).unwrap();
//! let copy = unsafe { Marshaler::<String>::from_abi(cache.abi()) }.unwrap();
//! cache.release();
//! assert_eq!(copy, "hello");
//! ```

use std::marker::PhantomData;

use crate::{
    convert::marshal::Marshal,
    data::layout::array::ArrayAbi,
    error::MarshalResult,
    memory::cache::Cache,
    registry::{self, Strategy},
};

/// Static marshaling operations for `T`.
pub struct Marshaler<T>(PhantomData<T>);

impl<T: Marshal> Marshaler<T> {
    /// The strategy of `T`.
    #[inline]
    pub fn strategy() -> MarshalResult<&'static Strategy<T>> {
        registry::strategy::<T>()
    }

    /// Convert `value` to its native form for the duration of a call.
    #[inline]
    pub fn create_cache(value: &T) -> MarshalResult<Cache<'_, T::Abi>> {
        Self::strategy()?.create_cache(value)
    }

    /// Convert a native form to a new value.
    ///
    /// Safety: `abi` must be a valid native form of `T` that hasn't been released.
    #[inline]
    pub unsafe fn from_abi(abi: T::Abi) -> MarshalResult<T> {
        unsafe { Self::strategy()?.from_abi(abi) }
    }

    /// Release a native form owned by the caller.
    ///
    /// If `T` can't be marshaled nothing is released.
    ///
    /// Safety: `abi` must be owned by the caller and must not be used again.
    #[inline]
    pub unsafe fn release_abi(abi: T::Abi) {
        if let Ok(strategy) = Self::strategy() {
            unsafe { strategy.release_abi(abi) }
        }
    }

    /// Convert `value` to a native form owned by the receiver.
    #[inline]
    pub fn into_abi(value: &T) -> MarshalResult<T::Abi> {
        Self::strategy()?.into_abi(value)
    }

    /// Convert `values` to their native form for the duration of a call.
    #[inline]
    pub fn create_cache_array(values: &[T]) -> MarshalResult<Cache<'_, ArrayAbi<T::Abi>>> {
        Self::strategy()?.create_cache_array(values)
    }

    /// Convert a native array to a new `Vec`.
    ///
    /// Safety: `abi` must point to `abi.len` valid native forms of `T`, or be empty.
    #[inline]
    pub unsafe fn from_abi_array(abi: ArrayAbi<T::Abi>) -> MarshalResult<Vec<T>> {
        unsafe { Self::strategy()?.from_abi_array(abi) }
    }

    /// Release a native array owned by the caller.
    ///
    /// Safety: `abi` must be owned by the caller and have been allocated with the task
    /// allocator, it must not be used again.
    #[inline]
    pub unsafe fn release_abi_array(abi: ArrayAbi<T::Abi>) {
        if let Ok(strategy) = Self::strategy() {
            unsafe { strategy.release_abi_array(abi) }
        }
    }

    /// Convert `values` to a native array owned by the receiver.
    #[inline]
    pub fn into_abi_array(values: &[T]) -> MarshalResult<ArrayAbi<T::Abi>> {
        Self::strategy()?.into_abi_array(values)
    }
}

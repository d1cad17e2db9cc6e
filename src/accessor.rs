//! Call native accessors generically.
//!
//! A native object exposes a value through up to four call shapes, supplied as raw function
//! pointers by whatever resolves the object's interface:
//!
//! - read: `fn(this) -> Abi`
//! - write: `fn(this, Abi)`
//! - output: `fn(this, *mut Abi)`
//! - by reference: `fn(this, *mut Abi)`, the callee may overwrite the value it receives.
//!
//! The callee only knows the native form. [`Accessor`] adapts Rust values around these calls
//! using nothing but the classified strategy of the value's type, [`ArrayAccessor`] does the same
//! for arrays.
//!
//! Values passed to the callee are borrowed by it for the duration of the call, they're
//! released when the call returns. Values returned by the callee are owned by the caller; they
//! are converted and then released.

use std::{ffi::c_void, mem};

use tracing::trace;

use crate::{
    convert::marshal::Marshal,
    data::layout::array::ArrayAbi,
    error::MarshalResult,
    registry::{self, Strategy},
};

/// Read a value.
pub type ReadFn<A> = unsafe extern "C" fn(this: *mut c_void) -> A;
/// Write a value.
pub type WriteFn<A> = unsafe extern "C" fn(this: *mut c_void, value: A);
/// Write a value to an output slot.
pub type OutputFn<A> = unsafe extern "C" fn(this: *mut c_void, out: *mut A);
/// Pass a value by reference.
pub type ByRefFn<A> = unsafe extern "C" fn(this: *mut c_void, value: *mut A);

/// The four call shapes of an accessor, bound to the native form `A`.
pub struct CallShapes<A> {
    pub read: ReadFn<A>,
    pub write: WriteFn<A>,
    pub output: OutputFn<A>,
    pub by_ref: ByRefFn<A>,
}

impl<A> CallShapes<A> {
    #[inline]
    pub const fn new(
        read: ReadFn<A>,
        write: WriteFn<A>,
        output: OutputFn<A>,
        by_ref: ByRefFn<A>,
    ) -> Self {
        CallShapes {
            read,
            write,
            output,
            by_ref,
        }
    }

    /// Bind raw function pointers. Returns `None` if any of them is null.
    ///
    /// Safety: every pointer must be null or point to a function with the matching signature.
    pub unsafe fn from_raw(
        read: *const c_void,
        write: *const c_void,
        output: *const c_void,
        by_ref: *const c_void,
    ) -> Option<Self> {
        if read.is_null() || write.is_null() || output.is_null() || by_ref.is_null() {
            return None;
        }

        unsafe {
            Some(CallShapes {
                read: mem::transmute::<*const c_void, ReadFn<A>>(read),
                write: mem::transmute::<*const c_void, WriteFn<A>>(write),
                output: mem::transmute::<*const c_void, OutputFn<A>>(output),
                by_ref: mem::transmute::<*const c_void, ByRefFn<A>>(by_ref),
            })
        }
    }
}

impl<A> Clone for CallShapes<A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for CallShapes<A> {}

// Releases a returned native form when dropped.
struct Returned<A: Copy, F: FnMut(A)> {
    abi: A,
    release: F,
}

impl<A: Copy, F: FnMut(A)> Drop for Returned<A, F> {
    fn drop(&mut self) {
        (self.release)(self.abi)
    }
}

/// The call shapes of a native accessor for values of type `T`.
pub struct Accessor<T: Marshal> {
    this: *mut c_void,
    shapes: CallShapes<T::Abi>,
    strategy: &'static Strategy<T>,
}

impl<T: Marshal> Accessor<T> {
    /// Bind `shapes` to the object `this`.
    ///
    /// Fails if `T` can't be marshaled.
    ///
    /// Safety: the call shapes must be callable with `this` for as long as the accessor is used.
    pub unsafe fn new(this: *mut c_void, shapes: CallShapes<T::Abi>) -> MarshalResult<Self> {
        let strategy = registry::strategy::<T>()?;
        Ok(Accessor {
            this,
            shapes,
            strategy,
        })
    }

    /// Read the value.
    pub fn get(&self) -> MarshalResult<T> {
        trace!(type_name = self.strategy.type_name(), "get");
        let strategy = self.strategy;

        let abi = unsafe { (self.shapes.read)(self.this) };
        let returned = Returned {
            abi,
            release: |abi: T::Abi| unsafe { strategy.release_abi(abi) },
        };

        unsafe { strategy.from_abi(returned.abi) }
    }

    /// Write `value`.
    pub fn put(&self, value: &T) -> MarshalResult<()> {
        trace!(type_name = self.strategy.type_name(), "put");
        let cache = self.strategy.create_cache(value)?;
        unsafe { (self.shapes.write)(self.this, cache.abi()) };
        cache.release();
        Ok(())
    }

    /// Read the value through an output slot.
    pub fn out(&self) -> MarshalResult<T> {
        trace!(type_name = self.strategy.type_name(), "out");
        let strategy = self.strategy;

        let mut slot = T::Abi::default();
        unsafe { (self.shapes.output)(self.this, &mut slot) };
        let returned = Returned {
            abi: slot,
            release: |abi: T::Abi| unsafe { strategy.release_abi(abi) },
        };

        unsafe { strategy.from_abi(returned.abi) }
    }

    /// Pass `value` by reference, and replace it with the value the callee leaves behind.
    ///
    /// If conversion fails, `value` is left unchanged.
    pub fn by_ref(&self, value: &mut T) -> MarshalResult<()> {
        trace!(type_name = self.strategy.type_name(), "by_ref");
        let strategy = self.strategy;

        let cache = strategy.create_cache(value)?;
        let original = cache.abi();
        let mut slot = original;
        unsafe { (self.shapes.by_ref)(self.this, &mut slot) };

        // A replaced value is owned by the caller, the original is still owned by the cache.
        let replaced = (slot != original).then(|| Returned {
            abi: slot,
            release: move |abi: T::Abi| unsafe { strategy.release_abi(abi) },
        });

        let converted = unsafe { strategy.from_abi(slot) };
        drop(replaced);
        cache.release();

        *value = converted?;
        Ok(())
    }
}

/// The call shapes of a native accessor for arrays of `T`.
pub struct ArrayAccessor<T: Marshal> {
    this: *mut c_void,
    shapes: CallShapes<ArrayAbi<T::Abi>>,
    strategy: &'static Strategy<T>,
}

impl<T: Marshal> ArrayAccessor<T> {
    /// Bind `shapes` to the object `this`.
    ///
    /// Fails if `T` can't be marshaled.
    ///
    /// Safety: the call shapes must be callable with `this` for as long as the accessor is used.
    pub unsafe fn new(
        this: *mut c_void,
        shapes: CallShapes<ArrayAbi<T::Abi>>,
    ) -> MarshalResult<Self> {
        let strategy = registry::strategy::<T>()?;
        Ok(ArrayAccessor {
            this,
            shapes,
            strategy,
        })
    }

    /// Read the array.
    pub fn get(&self) -> MarshalResult<Vec<T>> {
        trace!(type_name = self.strategy.type_name(), "get array");
        let strategy = self.strategy;

        let abi = unsafe { (self.shapes.read)(self.this) };
        let returned = Returned {
            abi,
            release: |abi: ArrayAbi<T::Abi>| unsafe { strategy.release_abi_array(abi) },
        };

        unsafe { strategy.from_abi_array(returned.abi) }
    }

    /// Write `values`.
    pub fn put(&self, values: &[T]) -> MarshalResult<()> {
        trace!(type_name = self.strategy.type_name(), "put array");
        let cache = self.strategy.create_cache_array(values)?;
        unsafe { (self.shapes.write)(self.this, cache.abi()) };
        cache.release();
        Ok(())
    }

    /// Read the array through an output slot.
    pub fn out(&self) -> MarshalResult<Vec<T>> {
        trace!(type_name = self.strategy.type_name(), "out array");
        let strategy = self.strategy;

        let mut slot = ArrayAbi::empty();
        unsafe { (self.shapes.output)(self.this, &mut slot) };
        let returned = Returned {
            abi: slot,
            release: |abi: ArrayAbi<T::Abi>| unsafe { strategy.release_abi_array(abi) },
        };

        unsafe { strategy.from_abi_array(returned.abi) }
    }

    /// Pass `values` by reference, and replace them with the array the callee leaves behind.
    ///
    /// If conversion fails, `values` is left unchanged.
    pub fn by_ref(&self, values: &mut Vec<T>) -> MarshalResult<()> {
        trace!(type_name = self.strategy.type_name(), "by_ref array");
        let strategy = self.strategy;

        let cache = strategy.create_cache_array(values)?;
        let original = cache.abi();
        let mut slot = original;
        unsafe { (self.shapes.by_ref)(self.this, &mut slot) };

        let replaced = (slot != original).then(|| Returned {
            abi: slot,
            release: move |abi: ArrayAbi<T::Abi>| unsafe { strategy.release_abi_array(abi) },
        });

        let converted = unsafe { strategy.from_abi_array(slot) };
        drop(replaced);
        cache.release();

        *values = converted?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;
    use crate::memory::ledger::ResourceLedger;

    struct Counter {
        value: i64,
    }

    unsafe extern "C" fn read(this: *mut c_void) -> i64 {
        unsafe { (*this.cast::<Counter>()).value }
    }

    unsafe extern "C" fn write(this: *mut c_void, value: i64) {
        unsafe { (*this.cast::<Counter>()).value = value }
    }

    unsafe extern "C" fn output(this: *mut c_void, out: *mut i64) {
        unsafe { out.write((*this.cast::<Counter>()).value) }
    }

    unsafe extern "C" fn increment(this: *mut c_void, value: *mut i64) {
        unsafe {
            (*this.cast::<Counter>()).value = *value;
            *value += 1;
        }
    }

    #[test]
    fn primitive_accessor() {
        let before = ResourceLedger::snapshot();
        let mut counter = Counter { value: 0 };
        let this = (&mut counter as *mut Counter).cast();
        let accessor = unsafe {
            Accessor::<i64>::new(this, CallShapes::new(read, write, output, increment)).unwrap()
        };

        accessor.put(&41).unwrap();
        assert_eq!(accessor.get().unwrap(), 41);
        assert_eq!(accessor.out().unwrap(), 41);

        let mut value = 9;
        accessor.by_ref(&mut value).unwrap();
        assert_eq!(value, 10);
        assert_eq!(accessor.get().unwrap(), 9);

        assert_eq!(ResourceLedger::snapshot(), before);
    }

    #[test]
    fn null_shapes_are_rejected() {
        let shapes = unsafe {
            CallShapes::<i64>::from_raw(read as *const c_void, ptr::null(), ptr::null(), ptr::null())
        };
        assert!(shapes.is_none());

        let shapes = unsafe {
            CallShapes::<i64>::from_raw(
                read as *const c_void,
                write as *const c_void,
                output as *const c_void,
                increment as *const c_void,
            )
        };
        assert!(shapes.is_some());
    }

    #[test]
    fn unsupported_type_is_rejected_at_bind_time() {
        unsafe extern "C" fn read_nested(_: *mut c_void) -> ArrayAbi<ArrayAbi<u8>> {
            ArrayAbi::empty()
        }

        unsafe extern "C" fn write_nested(_: *mut c_void, _: ArrayAbi<ArrayAbi<u8>>) {}

        unsafe extern "C" fn output_nested(_: *mut c_void, _: *mut ArrayAbi<ArrayAbi<u8>>) {}

        let shapes = CallShapes::new(read_nested, write_nested, output_nested, output_nested);
        let accessor = unsafe { ArrayAccessor::<Vec<u8>>::new(ptr::null_mut(), shapes) };
        assert!(accessor.is_err());
    }
}

//! The marshaling contract.
//!
//! A type is marshaled by implementing [`Marshal`], which provides the native form of the type,
//! its structure, and the operations that move a value across the boundary:
//!
//! - [`Marshal::create_cache`] converts a value to its native form for the duration of a call.
//!   The returned [`Cache`] owns everything the native form refers to.
//! - [`Marshal::from_abi`] converts a native form back to a new value. The native form is only
//!   read, it's never consumed.
//! - [`Marshal::release_abi`] releases a native form whose ownership has been transferred to the
//!   caller, e.g. a value returned by a native function.
//! - [`Marshal::into_abi`] creates a native form that is owned by whoever receives it.
//!
//! Implementations should be generated with the macros in this module rather than written by
//! hand. Before any of these operations are used, the type must be classified; [`Marshaler`]
//! takes care of that.
//!
//! [`Marshaler`]: crate::marshaler::Marshaler

use crate::{
    data::shape::{PrimitiveKind, TypeShape},
    error::{ClassificationError, ConversionError, MarshalResult},
    memory::cache::Cache,
};

/// Convert between a type and its native form.
///
/// Safety: `Abi` must be a valid native form of `Self`. If `shape` describes a native-compatible
/// type, `Abi` must be `Self`.
pub unsafe trait Marshal: Sized + 'static {
    /// The native form of this type.
    type Abi: Copy + Default + PartialEq + 'static;

    /// The structure of this type.
    fn shape() -> TypeShape;

    /// Convert `self` to its native form for the duration of a call.
    ///
    /// If this fails, everything that was allocated or pinned before the failure has been
    /// released.
    fn create_cache(&self) -> MarshalResult<Cache<'_, Self::Abi>>;

    /// Convert a native form to a new value.
    ///
    /// Safety: `abi` must be a valid native form, which must not have been released.
    unsafe fn from_abi(abi: Self::Abi) -> MarshalResult<Self>;

    /// Release a native form that is owned by the caller.
    ///
    /// This never fails, errors are logged and skipped.
    ///
    /// Safety: `abi` must be owned by the caller, and must not be used again.
    unsafe fn release_abi(abi: Self::Abi);

    /// Convert `self` to a native form that is owned by whoever receives it.
    ///
    /// The result must eventually be released with [`Marshal::release_abi`].
    fn into_abi(&self) -> MarshalResult<Self::Abi>;
}

/// Implement [`Marshal`] for a primitive type.
#[macro_export]
macro_rules! impl_pass_through {
    ($type:ty => $kind:ident) => {
        unsafe impl $crate::convert::marshal::Marshal for $type {
            type Abi = Self;

            #[inline]
            fn shape() -> $crate::data::shape::TypeShape {
                $crate::data::shape::TypeShape::Primitive(
                    $crate::data::shape::PrimitiveKind::$kind,
                )
            }

            #[inline]
            fn create_cache(
                &self,
            ) -> $crate::error::MarshalResult<$crate::memory::cache::Cache<'_, Self>> {
                Ok($crate::memory::cache::Cache::pass_through(*self))
            }

            #[inline]
            unsafe fn from_abi(abi: Self) -> $crate::error::MarshalResult<Self> {
                Ok(abi)
            }

            #[inline]
            unsafe fn release_abi(_: Self) {}

            #[inline]
            fn into_abi(&self) -> $crate::error::MarshalResult<Self> {
                Ok(*self)
            }
        }
    };
}

impl_pass_through!(i8 => I8);
impl_pass_through!(i16 => I16);
impl_pass_through!(i32 => I32);
impl_pass_through!(i64 => I64);
impl_pass_through!(isize => Isize);
impl_pass_through!(u8 => U8);
impl_pass_through!(u16 => U16);
impl_pass_through!(u32 => U32);
impl_pass_through!(u64 => U64);
impl_pass_through!(usize => Usize);
impl_pass_through!(f32 => F32);
impl_pass_through!(f64 => F64);

/// Implement [`Marshal`] for a primitive that is carried as an integer and checked when it's
/// converted back.
macro_rules! impl_validated {
    ($type:ty => $kind:ident, $abi:ty, |$value:ident| $to_abi:expr, |$raw:ident| $from_abi:expr) => {
        unsafe impl Marshal for $type {
            type Abi = $abi;

            #[inline]
            fn shape() -> TypeShape {
                TypeShape::Primitive(PrimitiveKind::$kind)
            }

            #[inline]
            fn create_cache(&self) -> MarshalResult<Cache<'_, $abi>> {
                let $value = *self;
                Ok(Cache::pass_through($to_abi))
            }

            #[inline]
            unsafe fn from_abi($raw: $abi) -> MarshalResult<Self> {
                $from_abi
            }

            #[inline]
            unsafe fn release_abi(_: $abi) {}

            #[inline]
            fn into_abi(&self) -> MarshalResult<$abi> {
                let $value = *self;
                Ok($to_abi)
            }
        }
    };
}

impl_validated!(bool => Bool, u8, |value| value as u8, |raw| match raw {
    0 => Ok(false),
    1 => Ok(true),
    value => Err(ConversionError::InvalidBool { value }.into()),
});

impl_validated!(char => Char, u32, |value| value as u32, |raw| match char::from_u32(raw) {
    Some(c) => Ok(c),
    None => Err(ConversionError::InvalidChar { value: raw }.into()),
});

/// Implement [`Marshal`] for a native-compatible composite.
///
/// All fields must be listed in declaration order, and every field must be native-compatible.
/// The type must be `#[repr(C)]` and implement `Copy`, `Default` and `PartialEq`, its native form
/// is the type itself.
///
/// ```
/// use abi_marshal::marshal_pass_through;
///
/// #[repr(C)]
/// #[derive(Copy, Clone, Debug, Default, PartialEq)]
/// pub struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// marshal_pass_through! {
///     Point { x: f64, y: f64 }
/// }
/// ```
#[macro_export]
macro_rules! marshal_pass_through {
    ($type:ident { $($field:ident: $field_ty:ty),* $(,)? }) => {
        const _: () = {
            #[allow(dead_code)]
            fn assert_fields(value: &$type) {
                let $type { $($field),* } = value;
                $(let _: &$field_ty = $field;)*
            }
        };

        unsafe impl $crate::convert::marshal::Marshal for $type {
            type Abi = Self;

            fn shape() -> $crate::data::shape::TypeShape {
                $crate::data::shape::TypeShape::composite(
                    stringify!($type),
                    vec![$($crate::data::shape::FieldShape::of::<$field_ty>(stringify!($field))),*],
                )
            }

            #[inline]
            fn create_cache(
                &self,
            ) -> $crate::error::MarshalResult<$crate::memory::cache::Cache<'_, Self>> {
                Ok($crate::memory::cache::Cache::pass_through(*self))
            }

            #[inline]
            unsafe fn from_abi(abi: Self) -> $crate::error::MarshalResult<Self> {
                Ok(abi)
            }

            #[inline]
            unsafe fn release_abi(_: Self) {}

            #[inline]
            fn into_abi(&self) -> $crate::error::MarshalResult<Self> {
                Ok(*self)
            }
        }
    };
}

/// Implement [`Marshal`] for a composite with fields that need conversion, and declare its native
/// layout.
///
/// All fields must be listed in declaration order. The native layout is a `#[repr(C)]` struct
/// with the given name that mirrors the fields, replacing each field's type with its native
/// form.
///
/// ```
/// use abi_marshal::marshal_composite;
///
/// #[derive(Clone, Debug, PartialEq)]
/// pub struct Person {
///     name: String,
///     age: u32,
/// }
///
/// marshal_composite! {
///     Person => pub AbiPerson { name: String, age: u32 }
/// }
/// ```
#[macro_export]
macro_rules! marshal_composite {
    ($type:ident => $vis:vis $abi:ident { $($field:ident: $field_ty:ty),+ $(,)? }) => {
        #[repr(C)]
        #[derive(Copy, Clone, Debug, Default, PartialEq)]
        $vis struct $abi {
            $(pub $field: <$field_ty as $crate::convert::marshal::Marshal>::Abi),+
        }

        unsafe impl $crate::convert::marshal::Marshal for $type {
            type Abi = $abi;

            fn shape() -> $crate::data::shape::TypeShape {
                $crate::data::shape::TypeShape::composite(
                    stringify!($type),
                    vec![$($crate::data::shape::FieldShape::of::<$field_ty>(stringify!($field))),+],
                )
            }

            fn create_cache(
                &self,
            ) -> $crate::error::MarshalResult<$crate::memory::cache::Cache<'_, $abi>> {
                let mut fields = $crate::convert::composite::FieldCaches::new(stringify!($type));
                let abi = $abi {
                    $($field: fields.marshal::<$field_ty>(stringify!($field), &self.$field)?),+
                };
                Ok(fields.finish(abi))
            }

            unsafe fn from_abi(abi: $abi) -> $crate::error::MarshalResult<Self> {
                unsafe {
                    Ok($type {
                        $($field: <$field_ty as $crate::convert::marshal::Marshal>::from_abi(abi.$field)?),+
                    })
                }
            }

            unsafe fn release_abi(abi: $abi) {
                unsafe {
                    $(<$field_ty as $crate::convert::marshal::Marshal>::release_abi(abi.$field);)+
                }
            }

            fn into_abi(&self) -> $crate::error::MarshalResult<$abi> {
                let mut abi = $abi::default();
                $(
                    match <$field_ty as $crate::convert::marshal::Marshal>::into_abi(&self.$field) {
                        Ok(field) => abi.$field = field,
                        Err(e) => {
                            unsafe { <Self as $crate::convert::marshal::Marshal>::release_abi(abi) };
                            return Err(e);
                        }
                    }
                )+
                Ok(abi)
            }
        }
    };
}

/// Implement [`Marshal`] for a type that implements [`OpaqueHandle`].
///
/// [`OpaqueHandle`]: crate::data::layout::handle::OpaqueHandle
#[macro_export]
macro_rules! impl_opaque_handle {
    ($type:ty) => {
        unsafe impl $crate::convert::marshal::Marshal for $type {
            type Abi = $crate::data::layout::handle::RawHandle;

            #[inline]
            fn shape() -> $crate::data::shape::TypeShape {
                $crate::data::shape::TypeShape::OpaqueHandle
            }

            #[inline]
            fn create_cache(
                &self,
            ) -> $crate::error::MarshalResult<
                $crate::memory::cache::Cache<'_, $crate::data::layout::handle::RawHandle>,
            > {
                Ok($crate::memory::cache::Cache::pass_through(
                    $crate::data::layout::handle::OpaqueHandle::as_raw(self),
                ))
            }

            #[inline]
            unsafe fn from_abi(
                abi: $crate::data::layout::handle::RawHandle,
            ) -> $crate::error::MarshalResult<Self> {
                unsafe { Ok(<Self as $crate::data::layout::handle::OpaqueHandle>::from_raw(abi)) }
            }

            #[inline]
            unsafe fn release_abi(_: $crate::data::layout::handle::RawHandle) {}

            #[inline]
            fn into_abi(
                &self,
            ) -> $crate::error::MarshalResult<$crate::data::layout::handle::RawHandle> {
                Ok($crate::data::layout::handle::OpaqueHandle::as_raw(self))
            }
        }
    };
}

impl_opaque_handle!(crate::data::layout::handle::ObjectHandle);

// Arrays can only be marshaled at the top level of a call, with the functions in
// `convert::array`. This implementation exists so composites with array fields and arrays of
// arrays can be described, and rejected by the classifier.
unsafe impl<T: Marshal> Marshal for Vec<T> {
    type Abi = crate::data::layout::array::ArrayAbi<T::Abi>;

    fn shape() -> TypeShape {
        TypeShape::Array(Box::new(T::shape()))
    }

    fn create_cache(&self) -> MarshalResult<Cache<'_, Self::Abi>> {
        Err(nested_array::<T>().into())
    }

    unsafe fn from_abi(_: Self::Abi) -> MarshalResult<Self> {
        Err(nested_array::<T>().into())
    }

    unsafe fn release_abi(_: Self::Abi) {}

    fn into_abi(&self) -> MarshalResult<Self::Abi> {
        Err(nested_array::<T>().into())
    }
}

fn nested_array<T>() -> ClassificationError {
    ClassificationError::NestedArray {
        type_name: std::any::type_name::<Vec<T>>().into(),
    }
}

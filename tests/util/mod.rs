#![allow(dead_code)]

use std::ffi::c_void;

use abi_marshal::prelude::*;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Blittable {
    pub i: i32,
    pub d: f64,
}

marshal_pass_through! {
    Blittable { i: i32, d: f64 }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NonBlittable {
    pub b: Blittable,
    pub s1: String,
    pub s2: String,
}

marshal_composite! {
    NonBlittable => pub AbiNonBlittable { b: Blittable, s1: String, s2: String }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Nested {
    pub inner: NonBlittable,
    pub handle: ObjectHandle,
    pub label: String,
}

marshal_composite! {
    Nested => pub AbiNested { inner: NonBlittable, handle: ObjectHandle, label: String }
}

pub fn non_blittable(i: i32, d: f64, s1: &str, s2: &str) -> NonBlittable {
    NonBlittable {
        b: Blittable { i, d },
        s1: s1.into(),
        s2: s2.into(),
    }
}

pub fn sample() -> NonBlittable {
    non_blittable(42, 1.5, "foo", "bar")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// The state behind a fake native property.
///
/// Reads return an owned copy of `value`. Writes replace `value`. A by-reference call stores the
/// value it receives, then replaces it with `replacement` if that's set.
pub struct Property<T> {
    pub value: T,
    pub replacement: Option<T>,
}

impl<T: Marshal> Property<T> {
    pub fn new(value: T) -> Self {
        Property {
            value,
            replacement: None,
        }
    }

    pub fn this(&mut self) -> *mut c_void {
        (self as *mut Self).cast()
    }

    pub fn shapes() -> CallShapes<T::Abi> {
        CallShapes::new(read::<T>, write::<T>, output::<T>, by_ref::<T>)
    }

    pub fn accessor(&mut self) -> Accessor<T> {
        unsafe { Accessor::new(self.this(), Self::shapes()).unwrap() }
    }
}

unsafe extern "C" fn read<T: Marshal>(this: *mut c_void) -> T::Abi {
    let property = unsafe { &*this.cast::<Property<T>>() };
    Marshaler::<T>::into_abi(&property.value).unwrap()
}

unsafe extern "C" fn write<T: Marshal>(this: *mut c_void, value: T::Abi) {
    let property = unsafe { &mut *this.cast::<Property<T>>() };
    property.value = unsafe { Marshaler::<T>::from_abi(value).unwrap() };
}

unsafe extern "C" fn output<T: Marshal>(this: *mut c_void, out: *mut T::Abi) {
    let property = unsafe { &*this.cast::<Property<T>>() };
    unsafe { out.write(Marshaler::<T>::into_abi(&property.value).unwrap()) };
}

unsafe extern "C" fn by_ref<T: Marshal>(this: *mut c_void, value: *mut T::Abi) {
    let property = unsafe { &mut *this.cast::<Property<T>>() };
    property.value = unsafe { Marshaler::<T>::from_abi(value.read()).unwrap() };
    if let Some(replacement) = property.replacement.as_ref() {
        unsafe { value.write(Marshaler::<T>::into_abi(replacement).unwrap()) };
    }
}

/// The state behind a fake native array property, it behaves like [`Property`].
pub struct ArrayProperty<T> {
    pub values: Vec<T>,
    pub replacement: Option<Vec<T>>,
}

impl<T: Marshal> ArrayProperty<T> {
    pub fn new(values: Vec<T>) -> Self {
        ArrayProperty {
            values,
            replacement: None,
        }
    }

    pub fn this(&mut self) -> *mut c_void {
        (self as *mut Self).cast()
    }

    pub fn shapes() -> CallShapes<ArrayAbi<T::Abi>> {
        CallShapes::new(
            read_array::<T>,
            write_array::<T>,
            output_array::<T>,
            by_ref_array::<T>,
        )
    }

    pub fn accessor(&mut self) -> ArrayAccessor<T> {
        unsafe { ArrayAccessor::new(self.this(), Self::shapes()).unwrap() }
    }
}

unsafe extern "C" fn read_array<T: Marshal>(this: *mut c_void) -> ArrayAbi<T::Abi> {
    let property = unsafe { &*this.cast::<ArrayProperty<T>>() };
    Marshaler::<T>::into_abi_array(&property.values).unwrap()
}

unsafe extern "C" fn write_array<T: Marshal>(this: *mut c_void, values: ArrayAbi<T::Abi>) {
    let property = unsafe { &mut *this.cast::<ArrayProperty<T>>() };
    property.values = unsafe { Marshaler::<T>::from_abi_array(values).unwrap() };
}

unsafe extern "C" fn output_array<T: Marshal>(this: *mut c_void, out: *mut ArrayAbi<T::Abi>) {
    let property = unsafe { &*this.cast::<ArrayProperty<T>>() };
    unsafe { out.write(Marshaler::<T>::into_abi_array(&property.values).unwrap()) };
}

unsafe extern "C" fn by_ref_array<T: Marshal>(this: *mut c_void, values: *mut ArrayAbi<T::Abi>) {
    let property = unsafe { &mut *this.cast::<ArrayProperty<T>>() };
    property.values = unsafe { Marshaler::<T>::from_abi_array(values.read()).unwrap() };
    if let Some(replacement) = property.replacement.as_ref() {
        unsafe { values.write(Marshaler::<T>::into_abi_array(replacement).unwrap()) };
    }
}

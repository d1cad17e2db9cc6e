//! abi-marshal converts values between their Rust representation and a fixed, C-ABI-compatible
//! native representation, so generic code can call native functions whose argument types are
//! only known as the native form of some type `T`.
//!
//! # Overview
//!
//! Every marshalable type implements [`Marshal`], usually with one of the registration macros.
//! The first time a type is used it's classified into one of five strategies:
//!
//!  - pass-through: primitives and composites whose fields are all native-compatible are their
//!    own native form.
//!  - bound composite: composites with fields that need conversion use a registered native
//!    layout that mirrors their fields.
//!  - validated: `bool` and `char` are carried as `u8` and `u32` and checked when converted
//!    back.
//!  - string: text is converted to a native string handle.
//!  - opaque handle: references whose lifetime is managed elsewhere are passed through as a
//!    pointer-sized handle.
//!
//! Arrays of any of these can be marshaled at the top level of a call, either by using the
//! array's own buffer if the elements are native-compatible, or by converting every element.
//! Arrays of arrays and composites with array fields are rejected.
//!
//! Converting a value to its native form produces a [`Cache`], which owns every resource the
//! native form depends on: pinned buffers, string headers and blocks of converted elements. A
//! cache is released exactly once, when it's dropped or explicitly released. If building a
//! cache fails halfway through, everything built so far is released before the error is
//! returned.
//!
//! # Example
//!
//! ```
//! use abi_marshal::prelude::*;
//!
//! #[repr(C)]
//! #[derive(Copy, Clone, Debug, Default, PartialEq)]
//! pub struct Blittable {
//!     i: i32,
//!     d: f64,
//! }
//!
//! marshal_pass_through! {
//!     Blittable { i: i32, d: f64 }
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! pub struct NonBlittable {
//!     b: Blittable,
//!     s1: String,
//!     s2: String,
//! }
//!
//! marshal_composite! {
//!     NonBlittable => pub AbiNonBlittable { b: Blittable, s1: String, s2: String }
//! }
//!
//! let value = NonBlittable {
//!     b: Blittable { i: 42, d: 1.5 },
//!     s1: "foo".into(),
//!     s2: "bar".into(),
//! };
//!
//! let cache = Marshaler::<NonBlittable>::create_cache(&value).unwrap();
//! let abi: AbiNonBlittable = cache.abi();
//! let copy = unsafe { Marshaler::<NonBlittable>::from_abi(abi) }.unwrap();
//! cache.release();
//!
//! assert_eq!(copy, value);
//! ```
//!
//! # Ownership
//!
//! Native forms created from a cache are borrowed by the callee for the duration of a call.
//! Native forms returned by a callee are owned by the caller, who converts them with
//! `from_abi` and then releases them with `release_abi`. Owned native forms are produced with
//! `into_abi`, which allocates owned strings and arrays with the task allocator.
//!
//! # Features
//!
//!  - `fault-injection`: expose `native::fault` to make native operations fail on demand.
//!
//! [`Marshal`]: crate::convert::marshal::Marshal
//! [`Cache`]: crate::memory::cache::Cache

#![forbid(rustdoc::broken_intra_doc_links)]

pub mod accessor;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod marshaler;
pub mod memory;
pub mod native;
pub mod prelude;
pub mod registry;

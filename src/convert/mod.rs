//! Conversions between Rust values and their native form.
//!
//! The [`Marshal`] trait is the contract every marshalable type implements. It's implemented for
//! the primitive types and `String` by this crate; composites and opaque handles implement it
//! with the registration macros [`marshal_pass_through`], [`marshal_composite`] and
//! [`impl_opaque_handle`]. Arrays are marshaled by the functions in [`array`], which pick a
//! block copy or a per-element conversion depending on the element type.
//!
//! [`Marshal`]: crate::convert::marshal::Marshal
//! [`marshal_pass_through`]: crate::marshal_pass_through
//! [`marshal_composite`]: crate::marshal_composite
//! [`impl_opaque_handle`]: crate::impl_opaque_handle

pub mod array;
pub mod composite;
pub mod marshal;
pub mod string;

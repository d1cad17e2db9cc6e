//! Type shapes and native layouts.
//!
//! Every marshalable type describes its structure with a [`TypeShape`], which is used to
//! classify the type into a marshaling strategy. The [`layout`] module contains the native forms
//! that aren't provided by the marshaled types themselves: the (pointer, length) pair of an array
//! and the pointer-sized handle of an opaque reference.
//!
//! [`TypeShape`]: crate::data::shape::TypeShape

pub mod layout;
pub mod shape;

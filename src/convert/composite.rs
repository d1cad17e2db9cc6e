//! Marshaling composites.
//!
//! The cache of a composite is built one field at a time, in declaration order. Each field's
//! cache is split into its native form, which is written to the native layout, and its
//! resources, which are appended to the resources of the composite. If a field fails, the
//! resources of the fields that were built before it are released in the order they were built
//! and the error is returned.

use tracing::debug;

use crate::{
    convert::marshal::Marshal,
    error::MarshalResult,
    memory::cache::{Cache, Resources},
};

/// Accumulates the resources of the fields of a composite under construction.
///
/// This type is used by the code generated by [`marshal_composite`].
///
/// [`marshal_composite`]: crate::marshal_composite
#[derive(Debug)]
pub struct FieldCaches<'a> {
    type_name: &'static str,
    resources: Resources<'a>,
    n_built: usize,
}

impl<'a> FieldCaches<'a> {
    #[inline]
    pub fn new(type_name: &'static str) -> Self {
        FieldCaches {
            type_name,
            resources: Resources::default(),
            n_built: 0,
        }
    }

    /// Marshal the next field and return its native form.
    pub fn marshal<F: Marshal>(&mut self, field: &'static str, value: &'a F) -> MarshalResult<F::Abi> {
        match value.create_cache() {
            Ok(cache) => {
                let (abi, resources) = cache.into_parts();
                self.resources.append(resources);
                self.n_built += 1;
                Ok(abi)
            }
            Err(e) => {
                debug!(
                    type_name = self.type_name,
                    field,
                    n_built = self.n_built,
                    "failed to marshal field, releasing fields built so far"
                );
                Err(e)
            }
        }
    }

    /// The number of fields that have been marshaled.
    #[inline]
    pub fn n_built(&self) -> usize {
        self.n_built
    }

    /// Combine the native layout and the resources of all fields into a cache.
    #[inline]
    pub fn finish<A: Copy>(self, abi: A) -> Cache<'a, A> {
        Cache::new(abi, self.resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::ledger::ResourceLedger,
        native::fault::{self, NativeOp},
    };

    #[repr(C)]
    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    struct Blittable {
        i: i32,
        d: f64,
    }

    crate::marshal_pass_through! {
        Blittable { i: i32, d: f64 }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct NonBlittable {
        b: Blittable,
        s1: String,
        s2: String,
    }

    crate::marshal_composite! {
        NonBlittable => AbiNonBlittable { b: Blittable, s1: String, s2: String }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Triple {
        a: String,
        b: String,
        c: String,
    }

    crate::marshal_composite! {
        Triple => AbiTriple { a: String, b: String, c: String }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Outer {
        inner: NonBlittable,
        tag: String,
    }

    crate::marshal_composite! {
        Outer => AbiOuter { inner: NonBlittable, tag: String }
    }

    fn sample() -> NonBlittable {
        NonBlittable {
            b: Blittable { i: 42, d: 1.5 },
            s1: "foo".into(),
            s2: "bar".into(),
        }
    }

    #[test]
    fn composite_round_trips() {
        let before = ResourceLedger::snapshot();
        let value = sample();

        let cache = value.create_cache().unwrap();
        assert_eq!(cache.abi().b, value.b);
        assert_eq!(unsafe { NonBlittable::from_abi(cache.abi()) }.unwrap(), value);

        cache.release();
        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn nested_composite_round_trips() {
        let before = ResourceLedger::snapshot();
        let value = Outer {
            inner: sample(),
            tag: "outer".into(),
        };

        let cache = value.create_cache().unwrap();
        assert_eq!(cache.resources().len(), 6);
        assert_eq!(unsafe { Outer::from_abi(cache.abi()) }.unwrap(), value);

        drop(cache);
        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn failure_at_each_field_releases_earlier_fields() {
        let value = Triple {
            a: "a".into(),
            b: "b".into(),
            c: "c".into(),
        };

        for k in 0..3 {
            let before = ResourceLedger::snapshot();
            fault::fail_nth(NativeOp::StringReference, k);
            let err = value.create_cache().unwrap_err();
            assert!(err.is_construction());

            let after = ResourceLedger::snapshot();
            assert!(after.same_live(&before));
            assert_eq!(after.string_references_released, before.string_references_released + k);
            assert_eq!(after.pins_released, before.pins_released + k + 1);
        }
    }

    #[test]
    fn failure_at_field_index_two() {
        let before = ResourceLedger::snapshot();
        let value = sample();

        // Field 0 needs no native call, field 1 is the first string reference.
        fault::fail_nth(NativeOp::StringReference, 1);
        assert!(value.create_cache().is_err());

        let after = ResourceLedger::snapshot();
        assert!(after.same_live(&before));
        assert_eq!(after.string_references_released, before.string_references_released + 1);
    }

    #[test]
    fn owned_composite_is_released() {
        let before = ResourceLedger::snapshot();
        let value = sample();

        let abi = value.into_abi().unwrap();
        assert_eq!(ResourceLedger::snapshot().owned_strings, before.owned_strings + 2);
        assert_eq!(unsafe { NonBlittable::from_abi(abi) }.unwrap(), value);

        unsafe { NonBlittable::release_abi(abi) };
        assert_eq!(ResourceLedger::snapshot(), before);
    }

    #[test]
    fn failed_owned_composite_releases_partial_layout() {
        let before = ResourceLedger::snapshot();

        fault::fail_nth(NativeOp::StringAlloc, 1);
        assert!(sample().into_abi().is_err());
        assert_eq!(ResourceLedger::snapshot(), before);
    }

    #[test]
    fn composite_with_text_is_not_native_compatible() {
        assert!(!NonBlittable::shape().is_native_compatible());
        assert!(Blittable::shape().is_native_compatible());
    }
}

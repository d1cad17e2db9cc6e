//! Caches.
//!
//! A [`Cache`] holds the native form of a value together with the [`Resources`] that must stay
//! alive while that native form is in use. Resources are stored in a flat list of slots; the
//! caches of fields and elements don't nest, their slots are appended to the cache of the value
//! that contains them. Slots are released in the order they were added.

use smallvec::SmallVec;
use tracing::trace;

use super::{block::NativeBlock, pin::Pinned};
use crate::convert::string::StringReference;

/// A single resource owned by a cache.
#[derive(Debug)]
pub(crate) enum Slot<'a> {
    Pin(Pinned<'a>),
    String(StringReference),
    Block(NativeBlock),
}

/// The resources owned by a cache.
///
/// An empty set of resources is released by doing nothing.
#[derive(Debug, Default)]
pub struct Resources<'a> {
    slots: SmallVec<[Slot<'a>; 2]>,
}

impl<'a> Resources<'a> {
    #[inline]
    pub(crate) fn push(&mut self, slot: Slot<'a>) {
        self.slots.push(slot);
    }

    /// Move all resources of `other` to the end of `self`.
    #[inline]
    pub fn append(&mut self, mut other: Resources<'a>) {
        self.slots.extend(other.slots.drain(..));
    }

    /// The number of owned resources.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release all resources.
    pub fn release(mut self) {
        self.release_slots()
    }

    fn release_slots(&mut self) {
        if self.slots.is_empty() {
            return;
        }

        trace!(n_slots = self.slots.len(), "release resources");
        for slot in self.slots.drain(..) {
            drop(slot);
        }
    }
}

impl Drop for Resources<'_> {
    fn drop(&mut self) {
        self.release_slots()
    }
}

/// The native form of a value and the resources it depends on.
///
/// The native form can only be used while the cache is alive. Dropping the cache releases its
/// resources, [`Cache::release`] does the same explicitly.
#[derive(Debug)]
pub struct Cache<'a, A> {
    abi: A,
    resources: Resources<'a>,
}

impl<'a, A: Copy> Cache<'a, A> {
    /// A cache that owns no resources.
    #[inline]
    pub fn pass_through(abi: A) -> Self {
        Cache {
            abi,
            resources: Resources::default(),
        }
    }

    #[inline]
    pub(crate) fn new(abi: A, resources: Resources<'a>) -> Self {
        Cache { abi, resources }
    }

    /// The native form of the cached value.
    #[inline]
    pub fn abi(&self) -> A {
        self.abi
    }

    /// The resources owned by this cache.
    #[inline]
    pub fn resources(&self) -> &Resources<'a> {
        &self.resources
    }

    /// Release the resources owned by this cache.
    #[inline]
    pub fn release(self) {
        self.resources.release()
    }

    /// Split the cache into its native form and its resources.
    ///
    /// The native form must not be used after the resources have been released.
    #[inline]
    pub fn into_parts(self) -> (A, Resources<'a>) {
        (self.abi, self.resources)
    }
}

impl<A: Copy + Default> Default for Cache<'_, A> {
    #[inline]
    fn default() -> Self {
        Cache::pass_through(A::default())
    }
}

//! Marshaling strategies.

use crate::{
    convert::{
        array::{block, element},
        marshal::Marshal,
    },
    data::layout::array::ArrayAbi,
    error::MarshalResult,
    memory::cache::Cache,
};

/// How a type is marshaled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// The type is its own native form.
    PassThrough,
    /// A composite with a registered native layout.
    BoundComposite,
    /// A primitive whose native form is checked when it's converted back.
    Validated,
    /// Text.
    String,
    /// A handle that is passed through unchanged.
    OpaqueHandle,
}

/// How arrays of a type are marshaled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayStrategy {
    /// The array is pinned and used directly.
    BlockCopy,
    /// Every element is converted separately.
    PerElement,
}

struct ArrayOps<T: Marshal> {
    create_cache: for<'a> fn(&'a [T]) -> MarshalResult<Cache<'a, ArrayAbi<T::Abi>>>,
    from_abi: unsafe fn(ArrayAbi<T::Abi>) -> MarshalResult<Vec<T>>,
    release_abi: unsafe fn(ArrayAbi<T::Abi>),
    into_abi: fn(&[T]) -> MarshalResult<ArrayAbi<T::Abi>>,
}

impl<T: Marshal> ArrayOps<T> {
    fn new(strategy: ArrayStrategy) -> Self {
        match strategy {
            ArrayStrategy::BlockCopy => ArrayOps {
                create_cache: block::create_cache::<T>,
                from_abi: block::from_abi::<T>,
                release_abi: block::release_abi::<T>,
                into_abi: block::into_abi::<T>,
            },
            ArrayStrategy::PerElement => ArrayOps {
                create_cache: element::create_cache::<T>,
                from_abi: element::from_abi::<T>,
                release_abi: element::release_abi::<T>,
                into_abi: element::into_abi::<T>,
            },
        }
    }
}

/// The classified marshaling operations of `T`.
///
/// A strategy is created once per type by the registry and lives until the process exits.
pub struct Strategy<T: Marshal> {
    type_name: &'static str,
    kind: StrategyKind,
    array: ArrayStrategy,
    array_ops: ArrayOps<T>,
}

impl<T: Marshal> std::fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("array", &self.array)
            .finish_non_exhaustive()
    }
}

impl<T: Marshal> Strategy<T> {
    pub(crate) fn new(type_name: &'static str, kind: StrategyKind, array: ArrayStrategy) -> Self {
        Strategy {
            type_name,
            kind,
            array,
            array_ops: ArrayOps::new(array),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    #[inline]
    pub fn array_strategy(&self) -> ArrayStrategy {
        self.array
    }

    #[inline]
    pub fn create_cache<'a>(&self, value: &'a T) -> MarshalResult<Cache<'a, T::Abi>> {
        value.create_cache()
    }

    #[inline]
    pub fn project(&self, cache: &Cache<'_, T::Abi>) -> T::Abi {
        cache.abi()
    }

    /// Safety: see [`Marshal::from_abi`].
    #[inline]
    pub unsafe fn from_abi(&self, abi: T::Abi) -> MarshalResult<T> {
        unsafe { T::from_abi(abi) }
    }

    #[inline]
    pub fn release_cache(&self, cache: Cache<'_, T::Abi>) {
        cache.release()
    }

    /// Safety: see [`Marshal::release_abi`].
    #[inline]
    pub unsafe fn release_abi(&self, abi: T::Abi) {
        unsafe { T::release_abi(abi) }
    }

    #[inline]
    pub fn into_abi(&self, value: &T) -> MarshalResult<T::Abi> {
        value.into_abi()
    }

    #[inline]
    pub fn create_cache_array<'a>(
        &self,
        values: &'a [T],
    ) -> MarshalResult<Cache<'a, ArrayAbi<T::Abi>>> {
        (self.array_ops.create_cache)(values)
    }

    #[inline]
    pub fn project_array(&self, cache: &Cache<'_, ArrayAbi<T::Abi>>) -> ArrayAbi<T::Abi> {
        cache.abi()
    }

    /// Safety: `abi` must point to `abi.len` valid native forms, or be empty.
    #[inline]
    pub unsafe fn from_abi_array(&self, abi: ArrayAbi<T::Abi>) -> MarshalResult<Vec<T>> {
        unsafe { (self.array_ops.from_abi)(abi) }
    }

    #[inline]
    pub fn release_cache_array(&self, cache: Cache<'_, ArrayAbi<T::Abi>>) {
        cache.release()
    }

    /// Safety: `abi` must be an array owned by the caller that was allocated with the task
    /// allocator, and must not be used again.
    #[inline]
    pub unsafe fn release_abi_array(&self, abi: ArrayAbi<T::Abi>) {
        unsafe { (self.array_ops.release_abi)(abi) }
    }

    #[inline]
    pub fn into_abi_array(&self, values: &[T]) -> MarshalResult<ArrayAbi<T::Abi>> {
        (self.array_ops.into_abi)(values)
    }
}

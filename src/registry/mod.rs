//! The strategy registry.
//!
//! Every type is classified the first time it's marshaled. The resulting [`Strategy`], or the
//! [`ClassificationError`] if the type can't be marshaled, is stored in a process-wide registry
//! and reused for the rest of the process. Concurrent first uses of the same type are serialized
//! by a lock, so a type is classified exactly once and every caller observes the same strategy.
//!
//! [`ClassificationError`]: crate::error::ClassificationError

pub mod classify;
pub mod strategy;

use std::any::{Any, TypeId};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

pub use self::{
    classify::classify,
    strategy::{ArrayStrategy, Strategy, StrategyKind},
};
use crate::{
    convert::marshal::Marshal,
    error::{ClassificationError, MarshalResult},
};

type Entry = Result<&'static (dyn Any + Send + Sync), ClassificationError>;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

struct Registry {
    strategies: RwLock<FxHashMap<TypeId, Entry>>,
}

impl Registry {
    fn new() -> Self {
        Registry {
            strategies: RwLock::new(FxHashMap::default()),
        }
    }

    #[inline]
    fn get<T: Marshal>(&self) -> Option<MarshalResult<&'static Strategy<T>>> {
        let strategies = self.strategies.read();
        strategies.get(&TypeId::of::<T>()).map(downcast::<T>)
    }

    #[inline(never)]
    #[cold]
    fn init<T: Marshal>(&self) -> MarshalResult<&'static Strategy<T>> {
        let mut strategies = self.strategies.write();
        let entry = strategies
            .entry(TypeId::of::<T>())
            .or_insert_with(|| match classify::<T>() {
                Ok(strategy) => {
                    debug!(
                        type_name = strategy.type_name(),
                        kind = ?strategy.kind(),
                        array = ?strategy.array_strategy(),
                        "classified type"
                    );
                    let strategy: &'static Strategy<T> = Box::leak(Box::new(strategy));
                    Ok(strategy as &'static (dyn Any + Send + Sync))
                }
                Err(e) => {
                    warn!(type_name = std::any::type_name::<T>(), error = %e, "type can't be marshaled");
                    Err(e)
                }
            });

        downcast::<T>(entry)
    }
}

fn downcast<T: Marshal>(entry: &Entry) -> MarshalResult<&'static Strategy<T>> {
    match entry {
        Ok(strategy) => {
            let strategy: &'static (dyn Any + Send + Sync) = *strategy;
            match strategy.downcast_ref::<Strategy<T>>() {
                Some(strategy) => Ok(strategy),
                None => unreachable!("strategy registered under a foreign type id"),
            }
        }
        Err(e) => Err(e.clone().into()),
    }
}

/// Returns the strategy of `T`, classifying `T` if this is its first use.
///
/// If `T` can't be marshaled the cached classification error is returned.
pub fn strategy<T: Marshal>() -> MarshalResult<&'static Strategy<T>> {
    match REGISTRY.get::<T>() {
        Some(strategy) => strategy,
        None => REGISTRY.init::<T>(),
    }
}

/// Returns `true` if `T` has been classified, successfully or not.
pub fn is_classified<T: Marshal>() -> bool {
    REGISTRY.strategies.read().contains_key(&TypeId::of::<T>())
}

//! Resource accounting.

use std::cell::Cell;

/// Counters of the native resources used by the current thread.
///
/// Fields without the `_released` suffix count live resources, the others count how many
/// resources of that kind have been released since the thread started. Comparing snapshots taken
/// before and after an operation shows whether it leaked anything.
///
/// A resource is counted by the thread that creates it and uncounted by the thread that releases
/// it. Releasing on a thread that has no live resources of that kind leaves its counter at 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    /// Live pins.
    pub pins: usize,
    /// Pins that have been released.
    pub pins_released: usize,
    /// Live reference strings.
    pub string_references: usize,
    /// Reference strings that have been released.
    pub string_references_released: usize,
    /// Live owned native strings.
    pub owned_strings: usize,
    /// Live buffers allocated with the task allocator.
    pub native_allocations: usize,
    /// Live native-layout blocks owned by caches.
    pub blocks: usize,
}

thread_local! {
    static LEDGER: Cell<ResourceLedger> = const {
        Cell::new(ResourceLedger {
            pins: 0,
            pins_released: 0,
            string_references: 0,
            string_references_released: 0,
            owned_strings: 0,
            native_allocations: 0,
            blocks: 0,
        })
    };
}

impl ResourceLedger {
    /// Returns the counters of the current thread.
    pub fn snapshot() -> Self {
        LEDGER.with(Cell::get)
    }

    /// Returns `true` if no resources are live.
    pub fn is_clear(&self) -> bool {
        self.pins == 0
            && self.string_references == 0
            && self.owned_strings == 0
            && self.native_allocations == 0
            && self.blocks == 0
    }

    /// Returns `true` if `self` and `other` have the same number of live resources.
    pub fn same_live(&self, other: &Self) -> bool {
        self.pins == other.pins
            && self.string_references == other.string_references
            && self.owned_strings == other.owned_strings
            && self.native_allocations == other.native_allocations
            && self.blocks == other.blocks
    }
}

pub(crate) fn record<F: FnOnce(&mut ResourceLedger)>(f: F) {
    LEDGER.with(|ledger| {
        let mut current = ledger.get();
        f(&mut current);
        ledger.set(current);
    })
}

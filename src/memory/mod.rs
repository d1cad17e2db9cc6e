//! Per-call resource management.
//!
//! Marshaling a value to its native form can require resources that must stay alive while the
//! native side uses the value: a managed buffer must not move while a native string refers to
//! it, the header of a reference string must stay at a fixed address, and values whose elements
//! need conversion are written to a separately allocated block. These resources are owned by a
//! [`Cache`], which releases them exactly once when it's dropped or explicitly released, no
//! matter whether the call that used it succeeded.
//!
//! Building a cache for a composite or an array takes several steps. If one of them fails, the
//! resources that were built before it are released before the error is returned, so a partially
//! built cache is never observable.
//!
//! Every resource is recorded in the [`ResourceLedger`] of the current thread.
//!
//! [`Cache`]: crate::memory::cache::Cache
//! [`ResourceLedger`]: crate::memory::ledger::ResourceLedger

pub mod block;
pub mod cache;
pub mod ledger;
pub mod pin;

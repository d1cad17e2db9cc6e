//! Pins.
//!
//! A [`Pinned`] borrows a buffer for as long as a native value refers to it. The borrow
//! guarantees the buffer is neither moved nor freed while the pin exists; dropping the pin ends
//! the borrow but never deallocates the buffer, it remains owned by the caller.

use std::{marker::PhantomData, ptr::NonNull};

use tracing::trace;

use super::ledger;

/// A buffer that is guaranteed to stay at a fixed address for `'a`.
#[derive(Debug)]
pub struct Pinned<'a> {
    addr: NonNull<u8>,
    len: usize,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> Pinned<'a> {
    /// Pin `data`.
    pub fn new<T>(data: &'a [T]) -> Self {
        let addr = NonNull::from(data).cast::<u8>();
        let len = data.len();
        ledger::record(|l| l.pins += 1);
        trace!(addr = ?addr, len, "pin");

        Pinned {
            addr,
            len,
            _marker: PhantomData,
        }
    }

    /// The address of the pinned buffer.
    #[inline]
    pub fn addr(&self) -> *const u8 {
        self.addr.as_ptr()
    }

    /// The number of pinned elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Pinned<'_> {
    fn drop(&mut self) {
        ledger::record(|l| {
            l.pins = l.pins.saturating_sub(1);
            l.pins_released += 1;
        });
        trace!(addr = ?self.addr, len = self.len, "unpin");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ledger::ResourceLedger;

    #[test]
    fn unpin_keeps_buffer() {
        let before = ResourceLedger::snapshot();
        let data = vec![1u16, 2, 3];

        let pin = Pinned::new(&data);
        assert_eq!(pin.addr(), data.as_ptr().cast());
        assert_eq!(pin.len(), 3);
        assert_eq!(ResourceLedger::snapshot().pins, before.pins + 1);

        drop(pin);
        let after = ResourceLedger::snapshot();
        assert!(after.same_live(&before));
        assert_eq!(after.pins_released, before.pins_released + 1);
        assert_eq!(data, [1, 2, 3]);
    }
}

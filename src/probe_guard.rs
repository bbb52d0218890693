//! Catches element code that calls back into the set it is being probed by.
//!
//! `insert`, `contains` and `take` run `DeepHash`, `DeepEq` and `DeepClone`
//! while a bucket is half-scanned or half-edited. Debug builds record which
//! operation is in flight and panic, naming both operations, if a second one
//! starts before the first returns. Release builds keep only the `!Send`
//! marker.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct ProbeGuard {
    #[cfg(debug_assertions)]
    in_flight: Cell<Option<&'static str>>,
    // Single-threaded set: !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl ProbeGuard {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            in_flight: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Marks `op` as running until the scope drops.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> ProbeScope<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.in_flight.get() {
                panic!("DeepSet::{op} called from element code while DeepSet::{outer} was running");
            }
            self.in_flight.set(Some(op));
            return ProbeScope { guard: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return ProbeScope { _z: PhantomData };
        }
    }
}

pub(crate) struct ProbeScope<'a> {
    #[cfg(debug_assertions)]
    guard: &'a ProbeGuard,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ProbeScope<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.guard.in_flight.set(None);
    }
}

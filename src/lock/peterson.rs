use core::marker::PhantomData;

#[cfg(not(feature = "check-loom"))]
use core::sync::atomic::{AtomicBool, AtomicUsize};
#[cfg(feature = "check-loom")]
use loom::sync::atomic::{AtomicBool, AtomicUsize};

use crossbeam_utils::Backoff;

use crate::lock::*;

/// One of the two parties of a [`PetersonLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first party.
    Left = 0,
    /// The second party.
    Right = 1,
}

impl Side {
    /// Returns the other party.
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Peterson's two-party mutual exclusion.
///
/// Each party identifies itself with a [`Side`]. Two threads must not use the same side at the
/// same time.
#[derive(Debug)]
pub struct PetersonLock<O: MemoryOrdering = SeqCst> {
    desire: [AtomicBool; 2],
    turn: AtomicUsize,
    _marker: PhantomData<O>,
}

impl<O: MemoryOrdering> Default for PetersonLock<O> {
    fn default() -> Self {
        Self {
            desire: [AtomicBool::new(false), AtomicBool::new(false)],
            turn: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }
}

impl<O: MemoryOrdering> PetersonLock<O> {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `side`.
    pub fn acquire(&self, side: Side) {
        let me = side.index();
        let other = side.other().index();

        self.desire[me].store(true, O::RELAXED);
        // The swap orders the desire store before the loads below even in the acquire/release
        // flavor, where a plain store would not.
        self.turn.swap(other, O::RMW);

        let backoff = Backoff::new();
        while self.desire[other].load(O::LOAD) && self.turn.load(O::RELAXED) == other {
            spin(&backoff);
        }
    }

    /// Releases the lock held by `side`.
    pub fn release(&self, side: Side) {
        self.desire[side.index()].store(false, O::STORE);
    }
}

#[cfg(not(feature = "check-loom"))]
fn spin(backoff: &Backoff) {
    backoff.snooze();
}

#[cfg(feature = "check-loom")]
fn spin(_backoff: &Backoff) {
    loom::thread::yield_now();
}

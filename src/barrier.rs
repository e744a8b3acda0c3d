//! Barriers.
//!
//! A barrier blocks each of `n` threads until all `n` have arrived, and can be reused for any
//! number of generations.

use core::marker::PhantomData;

#[cfg(not(feature = "check-loom"))]
use core::sync::atomic::{AtomicBool, AtomicUsize};
#[cfg(feature = "check-loom")]
use loom::sync::atomic::{AtomicBool, AtomicUsize};

use crossbeam_utils::{Backoff, CachePadded};

use crate::error::{Error, Result};
use crate::lock::{MemoryOrdering, SeqCst};

/// Per-thread state of a barrier participant.
///
/// Each participating thread owns one token per barrier, created before the first `wait` and
/// reused for every later generation.
#[derive(Debug, Default)]
pub struct BarrierToken {
    sense: bool,
}

impl BarrierToken {
    /// Creates a token for a thread that has not passed the barrier yet.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Common interface of the barriers in this module.
pub trait Barrier: Send + Sync {
    /// Blocks until every participant has called `wait` for the current generation.
    ///
    /// Returns `true` for exactly one participant per generation.
    fn wait(&self, token: &mut BarrierToken) -> bool;
}

/// A sense-reversing spin barrier.
///
/// The last thread to arrive resets the arrival counter and flips the shared sense, which releases
/// the threads spinning on it. Each thread's token flips its local sense every generation, so a
/// fast thread entering the next generation can't be confused with a slow one leaving this one.
#[derive(Debug)]
pub struct SenseBarrier<O: MemoryOrdering = SeqCst> {
    count: CachePadded<AtomicUsize>,
    sense: CachePadded<AtomicBool>,
    parties: usize,
    _marker: PhantomData<O>,
}

impl<O: MemoryOrdering> SenseBarrier<O> {
    /// Creates a barrier for `parties` threads.
    pub fn new(parties: usize) -> Result<Self> {
        if parties == 0 {
            tracing::debug!("rejected barrier with zero parties");
            return Err(Error::config("a barrier needs at least one party"));
        }
        Ok(Self {
            count: CachePadded::new(AtomicUsize::new(0)),
            sense: CachePadded::new(AtomicBool::new(false)),
            parties,
            _marker: PhantomData,
        })
    }

    /// Number of threads the barrier waits for.
    pub fn parties(&self) -> usize {
        self.parties
    }
}

impl<O: MemoryOrdering> Barrier for SenseBarrier<O> {
    fn wait(&self, token: &mut BarrierToken) -> bool {
        token.sense = !token.sense;
        let sense = token.sense;

        let arrived = self.count.fetch_add(1, O::RMW);
        if arrived == self.parties - 1 {
            // Visible to the next generation through the sense store below.
            self.count.store(0, O::RELAXED);
            self.sense.store(sense, O::STORE);
            return true;
        }

        let backoff = Backoff::new();
        while self.sense.load(O::LOAD) != sense {
            spin(&backoff);
        }
        false
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

/// The platform's blocking barrier.
#[derive(Debug)]
pub struct PlatformBarrier {
    inner: std::sync::Barrier,
    parties: usize,
}

impl PlatformBarrier {
    /// Creates a barrier for `parties` threads.
    pub fn new(parties: usize) -> Result<Self> {
        if parties == 0 {
            return Err(Error::config("a barrier needs at least one party"));
        }
        Ok(Self {
            inner: std::sync::Barrier::new(parties),
            parties,
        })
    }

    /// Number of threads the barrier waits for.
    pub fn parties(&self) -> usize {
        self.parties
    }
}

impl Barrier for PlatformBarrier {
    fn wait(&self, _token: &mut BarrierToken) -> bool {
        self.inner.wait().is_leader()
    }
}

//! Memory-order flavors.
//!
//! Every spin lock and barrier comes in two flavors: one that uses `SeqCst` for every access, and
//! one that uses the weakest orderings that still give acquire/release semantics to the critical
//! section. The flavor is chosen with a type parameter, e.g. `TasLock<AcqRel>`.

use core::fmt::Debug;

#[cfg(not(feature = "check-loom"))]
use core::sync::atomic::Ordering;
#[cfg(feature = "check-loom")]
use loom::sync::atomic::Ordering;

/// A set of orderings used by the primitives in this crate.
pub trait MemoryOrdering: Debug + Default + Send + Sync + 'static {
    /// Ordering of loads that must observe a release.
    const LOAD: Ordering;
    /// Ordering of stores that publish a critical section.
    const STORE: Ordering;
    /// Ordering of read-modify-write operations that both observe and publish.
    const RMW: Ordering;
    /// Success ordering of a compare-and-swap that acquires a lock.
    const ACQUIRE: Ordering;
    /// Ordering of accesses that need no synchronization of their own.
    const RELAXED: Ordering;
}

/// Sequentially consistent flavor.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeqCst;

/// Acquire/release flavor.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcqRel;

impl MemoryOrdering for SeqCst {
    const LOAD: Ordering = Ordering::SeqCst;
    const STORE: Ordering = Ordering::SeqCst;
    const RMW: Ordering = Ordering::SeqCst;
    const ACQUIRE: Ordering = Ordering::SeqCst;
    const RELAXED: Ordering = Ordering::SeqCst;
}

impl MemoryOrdering for AcqRel {
    const LOAD: Ordering = Ordering::Acquire;
    const STORE: Ordering = Ordering::Release;
    const RMW: Ordering = Ordering::AcqRel;
    const ACQUIRE: Ordering = Ordering::Acquire;
    const RELAXED: Ordering = Ordering::Relaxed;
}

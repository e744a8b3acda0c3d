//! Locks.
//!
//! Spin locks come in a sequentially consistent and an acquire/release flavor selected by a
//! [`MemoryOrdering`] type parameter. Locks that need a per-thread token ([`McsLock`],
//! [`PetersonLock`]) take it from the caller.

mod api;
mod mcslock;
mod ordering;
mod peterson;
mod platform;
mod spinlock;
mod ticketlock;

pub use api::{Lock, LockGuard, RawLock, RawTryLock};
pub use mcslock::{McsGuard, McsLock, McsNode};
pub use ordering::{AcqRel, MemoryOrdering, SeqCst};
pub use peterson::{PetersonLock, Side};
pub use platform::PlatformLock;
pub use spinlock::{TasLock, TtasLock};
pub use ticketlock::TicketLock;

//! Elimination-backoff stacks.
//!
//! A push and a pop that meet in the elimination array cancel out without touching the inner
//! stack, which takes pressure off its single point of contention.

mod array;
mod base;
mod stack;

pub use array::EliminationArray;
pub use base::BaseStack;
pub use stack::ElimStack;

use crate::coarse::CoarseStack;
use crate::lock::PlatformLock;
use crate::lockfree::TreiberStack;

/// Elimination-backoff stack based on Treiber's stack.
pub type ElimTreiberStack = ElimStack<TreiberStack>;

/// Elimination-backoff stack based on a lock-guarded stack.
pub type ElimCoarseStack<L = PlatformLock> = ElimStack<CoarseStack<L>>;

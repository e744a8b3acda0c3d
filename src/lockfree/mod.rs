//! Lock-free data structures.

mod queue;
mod stack;

pub use queue::MsQueue;
pub use stack::{Node, TreiberStack};

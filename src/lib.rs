//! Concurrent containers and the synchronization primitives they are built from.

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::result_unit_err)]
#![deny(warnings, unsafe_op_in_unsafe_fn)]

pub mod adt;
pub mod barrier;
pub mod coarse;
pub mod config;
pub mod elim;
pub mod error;
pub mod flat_combining;
pub mod lock;
pub mod lockfree;
pub mod test;

pub use adt::{ConcurrentQueue, ConcurrentStack, Value, EMPTY};
pub use config::{ElimConfig, FcConfig};
pub use error::{Error, Result};

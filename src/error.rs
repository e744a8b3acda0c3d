//! Error types.
//!
//! An empty container is not an error: `pop`/`dequeue` report it with `None`. The variants here
//! are programmer errors that the containers make explicit instead of silently overrunning.

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Every slot of a flat-combining request log has been reserved.
    #[error("flat-combining request log is full (capacity {capacity})")]
    LogFull {
        /// Capacity of the exhausted log.
        capacity: usize,
    },

    /// A configuration value was rejected by `validate()`.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates an [`Error::InvalidConfig`].
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

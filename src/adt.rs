//! Container interfaces shared by every stack and queue in this crate.

/// The element type carried by every container.
pub type Value = i64;

/// Integer sentinel for drivers that expect `pop` to return a plain value.
///
/// The containers themselves report emptiness with `None`; this is only used by
/// [`ConcurrentStack::pop_or_empty`] and [`ConcurrentQueue::dequeue_or_empty`].
pub const EMPTY: Value = -1;

/// A LIFO container usable from any number of threads.
pub trait ConcurrentStack: Send + Sync {
    /// Pushes a value on top of the stack.
    fn push(&self, value: Value);

    /// Pops the most recently pushed value.
    ///
    /// Returns `None` if the stack was observed empty.
    fn pop(&self) -> Option<Value>;

    /// Like [`pop`](Self::pop), but returns [`EMPTY`] when the stack was observed empty.
    fn pop_or_empty(&self) -> Value {
        self.pop().unwrap_or(EMPTY)
    }
}

/// A FIFO container usable from any number of threads.
pub trait ConcurrentQueue: Send + Sync {
    /// Appends a value at the back of the queue.
    fn enqueue(&self, value: Value);

    /// Removes the oldest value.
    ///
    /// Returns `None` if the queue was observed empty.
    fn dequeue(&self) -> Option<Value>;

    /// Like [`dequeue`](Self::dequeue), but returns [`EMPTY`] when the queue was observed empty.
    fn dequeue_or_empty(&self) -> Value {
        self.dequeue().unwrap_or(EMPTY)
    }
}

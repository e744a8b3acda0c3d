//! Coarse-grained containers: one lock around a sequential container.
//!
//! These are the baseline the other containers are measured against, and the substrate of the
//! elimination-backoff coarse stack.

use std::collections::VecDeque;

use crossbeam_epoch::Guard;

use crate::adt::{ConcurrentQueue, ConcurrentStack, Value};
use crate::elim::BaseStack;
use crate::lock::{Lock, PlatformLock, RawLock, RawTryLock};

/// A stack guarded by a single lock.
#[derive(Debug, Default)]
pub struct CoarseStack<L: RawLock = PlatformLock> {
    inner: Lock<L, Vec<Value>>,
}

/// A queue guarded by a single lock.
#[derive(Debug, Default)]
pub struct CoarseQueue<L: RawLock = PlatformLock> {
    inner: Lock<L, VecDeque<Value>>,
}

impl<L: RawLock> CoarseStack<L> {
    /// Creates a new, empty stack.
    pub fn new() -> Self {
        Self {
            inner: Lock::new(Vec::new()),
        }
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn inner_lock(&self) -> crate::lock::LockGuard<'_, L, Vec<Value>> {
        self.inner.lock()
    }
}

impl<L: RawLock> ConcurrentStack for CoarseStack<L> {
    fn push(&self, value: Value) {
        self.inner.lock().push(value);
    }

    fn pop(&self) -> Option<Value> {
        self.inner.lock().pop()
    }
}

impl<L: RawTryLock> BaseStack for CoarseStack<L> {
    type PushReq = Value;

    fn request(value: Value) -> Value {
        value
    }

    fn request_value(req: &Value) -> Value {
        *req
    }

    fn try_push(&self, req: Value, _guard: &Guard) -> Result<(), Value> {
        match self.inner.try_lock() {
            Ok(mut stack) => {
                stack.push(req);
                Ok(())
            }
            Err(()) => Err(req),
        }
    }

    fn try_pop(&self, _guard: &Guard) -> Result<Option<Value>, ()> {
        self.inner.try_lock().map(|mut stack| stack.pop())
    }
}

impl<L: RawLock> CoarseQueue<L> {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Lock::new(VecDeque::new()),
        }
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<L: RawLock> ConcurrentQueue for CoarseQueue<L> {
    fn enqueue(&self, value: Value) {
        self.inner.lock().push_back(value);
    }

    fn dequeue(&self) -> Option<Value> {
        self.inner.lock().pop_front()
    }
}

use crate::adt::{ConcurrentStack, Value};
use crate::config::ElimConfig;
use crate::error::Result;

use super::array::EliminationArray;
use super::base::BaseStack;

/// Elimination-backoff stack.
///
/// Every operation first tries the inner stack once. On contention it goes to the elimination
/// array to meet an opposite operation, and tries the inner stack again if it met nobody.
#[derive(Debug, Default)]
pub struct ElimStack<S> {
    pub(crate) inner: S,
    pub(crate) array: EliminationArray,
}

impl<S: BaseStack> ElimStack<S> {
    /// Creates an empty stack with the default elimination configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stack with the given elimination configuration.
    pub fn with_config(config: ElimConfig) -> Result<Self> {
        let array = EliminationArray::new(config)?;
        tracing::debug!(
            slots = array.config().slots,
            timeout_us = array.config().timeout.as_micros() as u64,
            "elimination stack configured"
        );
        Ok(Self {
            inner: S::default(),
            array,
        })
    }

    /// Resets the elimination array.
    ///
    /// Construction already leaves the array ready; this is for reusing a stack whose threads
    /// have all been joined.
    pub fn init(&mut self) {
        self.array.init();
    }

    /// The elimination array backing this stack.
    pub fn array(&self) -> &EliminationArray {
        &self.array
    }

    /// Pushes a value on top of the stack.
    pub fn push(&self, value: Value) {
        let guard = crossbeam_epoch::pin();
        let mut req = S::request(value);

        loop {
            req = match self.inner.try_push(req, &guard) {
                Ok(()) => return,
                Err(req) => req,
            };

            if self.array.exchange_push(S::request_value(&req)) {
                return;
            }
        }
    }

    /// Pops the top value, or returns `None` if the stack is empty.
    pub fn pop(&self) -> Option<Value> {
        let guard = crossbeam_epoch::pin();

        loop {
            if let Ok(result) = self.inner.try_pop(&guard) {
                return result;
            }

            if let Some(value) = self.array.exchange_pop() {
                return Some(value);
            }
        }
    }
}

impl<S: BaseStack> ConcurrentStack for ElimStack<S> {
    fn push(&self, value: Value) {
        ElimStack::push(self, value);
    }

    fn pop(&self) -> Option<Value> {
        ElimStack::pop(self)
    }
}

use core::mem;
use core::sync::atomic::Ordering;

use crossbeam_epoch::{Atomic, Guard, Owned};

use crate::adt::{ConcurrentStack, Value};
use crate::elim::BaseStack;

/// Treiber's lock-free stack.
///
/// Usable with any number of producers and consumers. Popped nodes are retired to the epoch
/// collector, so a thread that read a stale `head` can still follow its `next` pointer safely.
#[derive(Debug)]
pub struct TreiberStack {
    head: Atomic<Node>,
}

/// A stack node, also the push request handed through elimination.
#[derive(Debug)]
pub struct Node {
    value: Value,
    next: Atomic<Node>,
}

impl Node {
    fn new(value: Value) -> Self {
        Self {
            value,
            next: Atomic::null(),
        }
    }
}

impl Default for TreiberStack {
    fn default() -> Self {
        Self {
            head: Atomic::null(),
        }
    }
}

impl TreiberStack {
    /// Creates a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value on top of the stack.
    pub fn push(&self, value: Value) {
        let mut req = Owned::new(Node::new(value));
        let guard = crossbeam_epoch::pin();

        loop {
            match self.try_push(req, &guard) {
                Ok(()) => break,
                Err(r) => req = r,
            }
        }
    }

    /// Attempts to pop the top element from the stack.
    ///
    /// Returns `None` if the stack is empty.
    pub fn pop(&self) -> Option<Value> {
        let guard = crossbeam_epoch::pin();

        loop {
            if let Ok(result) = self.try_pop(&guard) {
                return result;
            }
        }
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        let guard = crossbeam_epoch::pin();
        self.head.load(Ordering::Acquire, &guard).is_null()
    }
}

impl BaseStack for TreiberStack {
    type PushReq = Owned<Node>;

    fn request(value: Value) -> Self::PushReq {
        Owned::new(Node::new(value))
    }

    fn request_value(req: &Self::PushReq) -> Value {
        req.value
    }

    fn try_push(&self, req: Self::PushReq, guard: &Guard) -> Result<(), Self::PushReq> {
        let head = self.head.load(Ordering::Relaxed, guard);
        req.next.store(head, Ordering::Relaxed);

        // Linearization point. `Release` publishes `value` and `next` to the popper.
        self.head
            .compare_exchange(head, req, Ordering::Release, Ordering::Relaxed, guard)
            .map(|_| ())
            .map_err(|e| e.new)
    }

    fn try_pop(&self, guard: &Guard) -> Result<Option<Value>, ()> {
        let head = self.head.load(Ordering::Acquire, guard);
        // SAFETY: `head` is either null or a node that `guard` keeps from being freed.
        let Some(head_ref) = (unsafe { head.as_ref() }) else {
            return Ok(None);
        };
        let next = head_ref.next.load(Ordering::Relaxed, guard);

        // Linearization point.
        self.head
            .compare_exchange(head, next, Ordering::Relaxed, Ordering::Relaxed, guard)
            .map_err(|_| ())?;

        let value = head_ref.value;
        // SAFETY: `head` is now unreachable from `self`, and we no longer access it. Threads that
        // loaded it earlier are pinned, so the collector waits for them.
        unsafe { guard.defer_destroy(head) };
        Ok(Some(value))
    }
}

impl ConcurrentStack for TreiberStack {
    fn push(&self, value: Value) {
        TreiberStack::push(self, value);
    }

    fn pop(&self) -> Option<Value> {
        TreiberStack::pop(self)
    }
}

impl Drop for TreiberStack {
    fn drop(&mut self) {
        let mut o_curr = mem::take(&mut self.head);

        // SAFETY: All non-null nodes made were valid, and we have unique ownership via `&mut self`.
        while let Some(curr) = unsafe { o_curr.try_into_owned() }.map(Owned::into_box) {
            o_curr = curr.next;
        }
    }
}

//! Michael-Scott lock-free queue.
//!
//! Usable with any number of producers and consumers.
//!
//! Michael and Scott.  Simple, Fast, and Practical Non-Blocking and Blocking Concurrent Queue
//! Algorithms.  PODC 1996.  <http://dl.acm.org/citation.cfm?id=248106>

use core::mem;
use core::sync::atomic::Ordering;

use crossbeam_epoch::{unprotected, Atomic, Owned, Shared};
use crossbeam_utils::CachePadded;

use crate::adt::{ConcurrentQueue, Value};

/// Michael-Scott queue.
// The representation is a singly-linked list with a sentinel node at the front. `head` always
// points at the sentinel; the first value lives in the sentinel's successor. `tail` may lag one
// node behind the last node, and every operation that observes the lag helps move it forward.
#[derive(Debug)]
pub struct MsQueue {
    head: CachePadded<Atomic<Node>>,
    tail: CachePadded<Atomic<Node>>,
}

#[derive(Debug)]
struct Node {
    /// Unused in the sentinel.
    value: Value,
    next: Atomic<Node>,
}

impl Default for MsQueue {
    fn default() -> Self {
        let q = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
        };
        let sentinel = Owned::new(Node {
            value: 0,
            next: Atomic::null(),
        });
        // SAFETY: We are creating a new queue, hence have sole ownership of it.
        let sentinel = sentinel.into_shared(unsafe { unprotected() });
        q.head.store(sentinel, Ordering::Relaxed);
        q.tail.store(sentinel, Ordering::Relaxed);
        q
    }
}

impl MsQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the back of the queue.
    pub fn enqueue(&self, value: Value) {
        let guard = &crossbeam_epoch::pin();
        let new = Owned::new(Node {
            value,
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `tail` is never null, and `guard` keeps it alive.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            // The snapshot is stale; start over.
            if tail != self.tail.load(Ordering::Acquire, guard) {
                continue;
            }

            // `tail` lags behind: help move it forward before retrying our own link.
            if !next.is_null() {
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                continue;
            }

            // Linearization point: link at `tail.next`.
            if tail_ref
                .next
                .compare_exchange(
                    Shared::null(),
                    new,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                )
                .is_ok()
            {
                // Swing the tail; if this fails someone already helped.
                let _ = self.tail.compare_exchange(
                    tail,
                    new,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                return;
            }
        }
    }

    /// Removes the oldest value.
    ///
    /// Returns `None` if the queue is observed to be empty.
    pub fn dequeue(&self) -> Option<Value> {
        let guard = &crossbeam_epoch::pin();

        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `head` is never null, and `guard` keeps it alive.
            let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);

            if head != self.head.load(Ordering::Acquire, guard) {
                continue;
            }

            if head == tail {
                // Empty.
                if next.is_null() {
                    return None;
                }

                // One element, but `tail` still points at the sentinel.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                continue;
            }

            // SAFETY: `head != tail`, so the sentinel has a successor, kept alive by `guard`.
            let value = unsafe { next.deref() }.value;

            // Linearization point: `next` becomes the new sentinel.
            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // SAFETY: the old sentinel is unreachable from `self`, and we no longer access it.
                unsafe { guard.defer_destroy(head) };
                return Some(value);
            }
        }
    }

    /// Returns `true` if the queue is observed to be empty.
    pub fn is_empty(&self) -> bool {
        let guard = &crossbeam_epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        // SAFETY: `head` is never null, and `guard` keeps it alive.
        unsafe { head.deref() }
            .next
            .load(Ordering::Acquire, guard)
            .is_null()
    }
}

impl ConcurrentQueue for MsQueue {
    fn enqueue(&self, value: Value) {
        MsQueue::enqueue(self, value);
    }

    fn dequeue(&self) -> Option<Value> {
        MsQueue::dequeue(self)
    }
}

impl Drop for MsQueue {
    fn drop(&mut self) {
        let mut curr = mem::take(&mut *self.head);

        // SAFETY: every node from the sentinel on is valid, and we have unique ownership via
        // `&mut self`.
        while let Some(node) = unsafe { curr.try_into_owned() } {
            curr = node.into_box().next;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread::scope;

    const CONC_COUNT: i64 = 100_000;

    #[test]
    fn enqueue_dequeue_1() {
        let q = MsQueue::new();
        assert!(q.is_empty());
        q.enqueue(37);
        assert!(!q.is_empty());
        assert_eq!(q.dequeue(), Some(37));
        assert!(q.is_empty());
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn enqueue_dequeue_many_seq() {
        let q = MsQueue::new();
        for i in 0..200 {
            q.enqueue(i)
        }
        assert!(!q.is_empty());
        for i in 0..200 {
            assert_eq!(q.dequeue(), Some(i));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn spsc_fifo() {
        let q = MsQueue::new();

        scope(|scope| {
            scope.spawn(|| {
                let mut next = 0;

                while next < CONC_COUNT {
                    if let Some(elem) = q.dequeue() {
                        assert_eq!(elem, next);
                        next += 1;
                    }
                }
            });

            for i in 0..CONC_COUNT {
                q.enqueue(i)
            }
        });
        assert!(q.is_empty());
    }

    #[test]
    fn spmc_increasing() {
        fn recv(q: &MsQueue) {
            let mut cur = -1;
            for _ in 0..CONC_COUNT {
                if let Some(elem) = q.dequeue() {
                    assert!(elem > cur);
                    cur = elem;

                    if cur == CONC_COUNT - 1 {
                        break;
                    }
                }
            }
        }

        let q = MsQueue::new();
        scope(|scope| {
            for _ in 0..3 {
                scope.spawn(|| recv(&q));
            }

            scope.spawn(|| {
                for i in 0..CONC_COUNT {
                    q.enqueue(i);
                }
            });
        });
    }

    #[test]
    fn mpmc_per_producer_order() {
        // Producer `p` enqueues `p + 2 * i`; each consumer must see each producer's values in
        // increasing order.
        let q = MsQueue::new();

        scope(|scope| {
            for p in 0..2 {
                let q = &q;
                scope.spawn(move || {
                    for i in 0..CONC_COUNT {
                        q.enqueue(p + 2 * i)
                    }
                });
            }
            for _ in 0..2 {
                scope.spawn(|| {
                    let mut last = [-1, -1];
                    for _ in 0..CONC_COUNT {
                        if let Some(x) = q.dequeue() {
                            let p = (x % 2) as usize;
                            assert!(x > last[p]);
                            last[p] = x;
                        }
                    }
                });
            }
        });
    }
}

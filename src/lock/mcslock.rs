use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr};

use crossbeam_utils::{Backoff, CachePadded};

use crate::lock::*;

/// A queue node of an [`McsLock`].
///
/// Each waiter brings its own node and spins only on that node's flag.
#[derive(Debug)]
pub struct McsNode {
    inner: CachePadded<NodeInner>,
}

#[derive(Debug)]
struct NodeInner {
    locked: AtomicBool,
    next: AtomicPtr<McsNode>,
}

impl Default for McsNode {
    fn default() -> Self {
        Self::new()
    }
}

impl McsNode {
    /// Creates a node that is not linked into any queue.
    pub fn new() -> Self {
        Self {
            inner: CachePadded::new(NodeInner {
                locked: AtomicBool::new(false),
                next: AtomicPtr::new(ptr::null_mut()),
            }),
        }
    }
}

/// Raw token of an [`McsLock`] acquired through [`RawLock`]: a heap node owned by the holder.
#[derive(Debug)]
pub struct Token(*mut McsNode);

/// An MCS queue lock.
///
/// Waiters are granted the lock in the order they linked themselves onto the queue.
#[derive(Debug)]
pub struct McsLock<O: MemoryOrdering = SeqCst> {
    tail: AtomicPtr<McsNode>,
    _marker: PhantomData<O>,
}

impl<O: MemoryOrdering> Default for McsLock<O> {
    fn default() -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }
}

impl<O: MemoryOrdering> McsLock<O> {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock using a node supplied by the caller.
    ///
    /// The node is borrowed mutably until the returned guard is dropped, so it can't be shared
    /// by two acquisitions or freed while queued.
    pub fn acquire<'a>(&'a self, node: &'a mut McsNode) -> McsGuard<'a, O> {
        // Other waiters touch the node through shared pointers from here on.
        let node: &'a McsNode = node;
        // SAFETY: `node` outlives the guard, which is the only way to release it.
        unsafe { self.lock_node(node as *const _ as *mut _) };
        McsGuard { lock: self, node }
    }

    /// Releases the lock held by `guard`.
    pub fn release(&self, guard: McsGuard<'_, O>) {
        debug_assert!(ptr::eq(guard.lock, self), "guard of another lock");
        drop(guard);
    }

    /// # Safety
    ///
    /// `node` must stay valid and unused by anyone else until `unlock_node` on it returns.
    unsafe fn lock_node(&self, node: *mut McsNode) {
        // SAFETY: `node` is valid and not yet published.
        let inner = unsafe { &(*node).inner };
        inner.next.store(ptr::null_mut(), O::RELAXED);
        inner.locked.store(true, O::RELAXED);

        let prev = self.tail.swap(node, O::RMW);
        if prev.is_null() {
            return;
        }

        // SAFETY: `prev` was the tail, so its owner is in or waiting for the critical section and
        // will not release its node until it has seen this store.
        unsafe { (&(*prev).inner).next.store(node, O::STORE) };

        let backoff = Backoff::new();
        while inner.locked.load(O::LOAD) {
            backoff.snooze();
        }
    }

    /// # Safety
    ///
    /// `node` must be the node this thread locked with.
    unsafe fn unlock_node(&self, node: *mut McsNode) {
        // SAFETY: the caller owns `node` until this function returns.
        let inner = unsafe { &(*node).inner };
        let mut next = inner.next.load(O::LOAD);

        if next.is_null() {
            if self
                .tail
                .compare_exchange(node, ptr::null_mut(), O::RMW, O::RELAXED)
                .is_ok()
            {
                return;
            }

            // A successor swapped itself in but has not linked yet.
            let backoff = Backoff::new();
            loop {
                next = inner.next.load(O::LOAD);
                if !next.is_null() {
                    break;
                }
                backoff.snooze();
            }
        }

        // SAFETY: `next` is spinning on its own node, which stays valid until it is released.
        unsafe { (&(*next).inner).locked.store(false, O::STORE) };
    }
}

/// Holds an [`McsLock`] until dropped.
#[derive(Debug)]
pub struct McsGuard<'a, O: MemoryOrdering = SeqCst> {
    lock: &'a McsLock<O>,
    node: &'a McsNode,
}

impl<O: MemoryOrdering> Drop for McsGuard<'_, O> {
    fn drop(&mut self) {
        // SAFETY: the guard was created by `acquire` with this node.
        unsafe { self.lock.unlock_node(self.node as *const _ as *mut _) };
    }
}

unsafe impl<O: MemoryOrdering> RawLock for McsLock<O> {
    type Token = Token;

    fn lock(&self) -> Self::Token {
        let node = Box::into_raw(Box::new(McsNode::new()));
        // SAFETY: `node` is freshly allocated and only freed by `unlock`.
        unsafe { self.lock_node(node) };
        Token(node)
    }

    unsafe fn unlock(&self, token: Self::Token) {
        // SAFETY: `token` came from `lock`.
        unsafe { self.unlock_node(token.0) };
        // SAFETY: the successor, if any, has been handed the lock and no longer touches our node.
        drop(unsafe { Box::from_raw(token.0) });
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::thread::scope;

    use super::super::api;
    use super::*;

    #[test]
    fn smoke() {
        api::tests::smoke::<McsLock>();
        api::tests::smoke::<McsLock<AcqRel>>();
    }

    #[test]
    fn counter() {
        api::tests::counter::<McsLock<AcqRel>>();
    }

    #[test]
    fn caller_nodes() {
        const THREADS: usize = 4;
        const ITER: usize = 5_000;
        let lock = McsLock::<AcqRel>::default();
        let count = Mutex::new(0usize);

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut node = McsNode::new();
                    for _ in 0..ITER {
                        let guard = lock.acquire(&mut node);
                        // `try_lock` must never find the mutex held: the MCS lock already
                        // excludes everyone else.
                        let mut c = count.try_lock().unwrap();
                        *c += 1;
                        drop(c);
                        lock.release(guard);
                    }
                });
            }
        });

        assert_eq!(count.into_inner().unwrap(), THREADS * ITER);
    }

    #[test]
    fn fifo() {
        const THREADS: usize = 8;
        let lock = McsLock::<SeqCst>::default();
        let order = Mutex::new(Vec::new());
        let mut holder = McsNode::new();
        let mut nodes = (0..THREADS).map(|_| McsNode::new()).collect::<Vec<_>>();

        let held = lock.acquire(&mut holder);
        scope(|s| {
            for (i, node) in nodes.iter_mut().enumerate() {
                let addr: *const McsNode = &*node;
                let (lock, order) = (&lock, &order);
                s.spawn(move || {
                    let guard = lock.acquire(node);
                    order.lock().unwrap().push(i);
                    drop(guard);
                });

                // Wait until thread `i` has linked itself before starting the next one.
                while !ptr::eq(lock.tail.load(Ordering::SeqCst), addr) {
                    std::thread::yield_now();
                }
            }
            drop(held);
        });

        assert_eq!(
            order.into_inner().unwrap(),
            (0..THREADS).collect::<Vec<_>>()
        );
    }
}

use core::marker::PhantomData;
use core::sync::atomic::AtomicUsize;

use crossbeam_utils::{Backoff, CachePadded};

use crate::lock::*;

/// A ticket lock.
///
/// Waiters are served in the order they drew their tickets.
#[derive(Debug)]
pub struct TicketLock<O: MemoryOrdering = SeqCst> {
    now_serving: CachePadded<AtomicUsize>,
    next_ticket: CachePadded<AtomicUsize>,
    _marker: PhantomData<O>,
}

impl<O: MemoryOrdering> Default for TicketLock<O> {
    fn default() -> Self {
        Self {
            now_serving: CachePadded::new(AtomicUsize::new(0)),
            next_ticket: CachePadded::new(AtomicUsize::new(0)),
            _marker: PhantomData,
        }
    }
}

unsafe impl<O: MemoryOrdering> RawLock for TicketLock<O> {
    /// The ticket that was served.
    type Token = usize;

    fn lock(&self) -> usize {
        let ticket = self.next_ticket.fetch_add(1, O::RELAXED);
        let backoff = Backoff::new();

        while self.now_serving.load(O::LOAD) != ticket {
            backoff.snooze();
        }

        ticket
    }

    unsafe fn unlock(&self, ticket: usize) {
        self.now_serving.store(ticket.wrapping_add(1), O::STORE);
    }
}

unsafe impl<O: MemoryOrdering> RawTryLock for TicketLock<O> {
    fn try_lock(&self) -> Result<usize, ()> {
        let serving = self.now_serving.load(O::LOAD);

        // Only draw a ticket if it would be served right away.
        self.next_ticket
            .compare_exchange(serving, serving.wrapping_add(1), O::ACQUIRE, O::RELAXED)
            .map_err(|_| ())
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
        api::tests::smoke::<TicketLock>();
        api::tests::smoke::<TicketLock<AcqRel>>();
    }

    #[test]
    fn counter() {
        api::tests::counter::<TicketLock<AcqRel>>();
    }

    #[test]
    fn try_lock() {
        api::tests::try_lock::<TicketLock>();
        api::tests::try_lock::<TicketLock<AcqRel>>();
    }

    #[test]
    fn fifo() {
        const THREADS: usize = 8;
        let lock = TicketLock::<AcqRel>::default();
        let order = Mutex::new(Vec::new());

        let held = lock.lock();
        scope(|s| {
            for i in 0..THREADS {
                let (lock, order) = (&lock, &order);
                s.spawn(move || {
                    let ticket = lock.lock();
                    order.lock().unwrap().push(i);
                    unsafe { lock.unlock(ticket) };
                });

                // Wait until thread `i` has drawn its ticket before starting the next one.
                while lock.next_ticket.load(Ordering::SeqCst) != i + 2 {
                    std::thread::yield_now();
                }
            }
            unsafe { lock.unlock(held) };
        });

        assert_eq!(
            order.into_inner().unwrap(),
            (0..THREADS).collect::<Vec<_>>()
        );
    }
}

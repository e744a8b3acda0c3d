use core::marker::PhantomData;
use core::sync::atomic::AtomicBool;

use crossbeam_utils::Backoff;

use crate::lock::*;

/// A test-and-set spin lock.
///
/// Every waiter hammers the flag with compare-and-swap.
#[derive(Debug)]
pub struct TasLock<O: MemoryOrdering = SeqCst> {
    inner: AtomicBool,
    _marker: PhantomData<O>,
}

/// A test-and-test-and-set spin lock.
///
/// Waiters spin on a plain load and only try the compare-and-swap once the flag looks free, so the
/// cache line is shared while the lock is held.
#[derive(Debug)]
pub struct TtasLock<O: MemoryOrdering = SeqCst> {
    inner: AtomicBool,
    _marker: PhantomData<O>,
}

impl<O: MemoryOrdering> Default for TasLock<O> {
    fn default() -> Self {
        Self {
            inner: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }
}

impl<O: MemoryOrdering> Default for TtasLock<O> {
    fn default() -> Self {
        Self {
            inner: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }
}

#[inline]
fn test_and_set<O: MemoryOrdering>(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, O::ACQUIRE, O::RELAXED)
        .is_ok()
}

unsafe impl<O: MemoryOrdering> RawLock for TasLock<O> {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();

        while !test_and_set::<O>(&self.inner) {
            backoff.snooze();
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.inner.store(false, O::STORE);
    }
}

unsafe impl<O: MemoryOrdering> RawTryLock for TasLock<O> {
    fn try_lock(&self) -> Result<(), ()> {
        if test_and_set::<O>(&self.inner) {
            Ok(())
        } else {
            Err(())
        }
    }
}

unsafe impl<O: MemoryOrdering> RawLock for TtasLock<O> {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();

        loop {
            while self.inner.load(O::RELAXED) {
                backoff.snooze();
            }
            if test_and_set::<O>(&self.inner) {
                return;
            }
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.inner.store(false, O::STORE);
    }
}

unsafe impl<O: MemoryOrdering> RawTryLock for TtasLock<O> {
    fn try_lock(&self) -> Result<(), ()> {
        if !self.inner.load(O::RELAXED) && test_and_set::<O>(&self.inner) {
            Ok(())
        } else {
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::api;
    use super::*;

    #[test]
    fn smoke() {
        api::tests::smoke::<TasLock>();
        api::tests::smoke::<TasLock<AcqRel>>();
        api::tests::smoke::<TtasLock>();
        api::tests::smoke::<TtasLock<AcqRel>>();
    }

    #[test]
    fn counter() {
        api::tests::counter::<TasLock<AcqRel>>();
        api::tests::counter::<TtasLock<AcqRel>>();
    }

    #[test]
    fn try_lock() {
        api::tests::try_lock::<TasLock>();
        api::tests::try_lock::<TtasLock<AcqRel>>();
    }
}

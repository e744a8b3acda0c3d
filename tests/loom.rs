#![cfg(feature = "check-loom")]

use loom::cell::UnsafeCell;
use loom::sync::Arc;
use loom::thread;

use cds431::barrier::{Barrier, BarrierToken, SenseBarrier};
use cds431::lock::{AcqRel, PetersonLock, SeqCst, Side};

struct Shared<T>(UnsafeCell<T>);

// SAFETY: every test only touches the cell under the synchronization it is checking.
unsafe impl<T: Send> Sync for Shared<T> {}

fn peterson<O: cds431::lock::MemoryOrdering>() {
    loom::model(|| {
        let lock = Arc::new(PetersonLock::<O>::new());
        let count = Arc::new(Shared(UnsafeCell::new(0usize)));

        let handles: Vec<_> = [Side::Left, Side::Right]
            .into_iter()
            .map(|side| {
                let lock = lock.clone();
                let count = count.clone();
                thread::spawn(move || {
                    lock.acquire(side);
                    // SAFETY: `side` holds the lock.
                    count.0.with_mut(|c| unsafe { *c += 1 });
                    lock.release(side);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // SAFETY: both threads are joined.
        assert_eq!(count.0.with(|c| unsafe { *c }), 2);
    });
}

#[test]
fn peterson_seq_cst() {
    peterson::<SeqCst>();
}

#[test]
fn peterson_acq_rel() {
    peterson::<AcqRel>();
}

#[test]
fn sense_barrier_publishes() {
    loom::model(|| {
        let barrier = Arc::new(SenseBarrier::<AcqRel>::new(2).unwrap());
        let cells = Arc::new([Shared(UnsafeCell::new(0usize)), Shared(UnsafeCell::new(0usize))]);

        let handles: Vec<_> = (0..2)
            .map(|id| {
                let barrier = barrier.clone();
                let cells = cells.clone();
                thread::spawn(move || {
                    let mut token = BarrierToken::new();
                    // SAFETY: before the barrier, only this thread touches its cell.
                    cells[id].0.with_mut(|c| unsafe { *c = id + 1 });
                    let leader = barrier.wait(&mut token);
                    // SAFETY: after the barrier, nobody writes.
                    let other = cells[1 - id].0.with(|c| unsafe { *c });
                    assert_eq!(other, 2 - id);
                    leader
                })
            })
            .collect();

        let leaders = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&leader| leader)
            .count();
        assert_eq!(leaders, 1);
    });
}

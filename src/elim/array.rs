//! The elimination array: rendezvous slots where a push and a pop can cancel out.
//!
//! A slot's state word packs a 2-bit tag with a stamp that is bumped every time a pusher claims
//! the slot. The lifecycle of one claim is
//!
//! ```text
//! FREE --pusher claims--> CLAIMED --value written--> OFFERED --popper CAS--> TAKEN --pusher--> FREE
//!                                                      |
//!                                                      +--pusher times out, CAS--> FREE
//! ```
//!
//! The popper's `OFFERED -> TAKEN` and the pusher's `OFFERED -> FREE` are compare-and-swaps on
//! the same word, so exactly one of them wins. The stamp keeps a popper that read the value of
//! one claim from taking a later claim of the same slot.

use core::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::{Backoff, CachePadded};
use rand::{thread_rng, Rng};

use crate::adt::Value;
use crate::config::ElimConfig;
use crate::error::Result;

const TAG_BITS: u32 = 2;
const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

const FREE: u64 = 0;
const CLAIMED: u64 = 1;
const OFFERED: u64 = 2;
const TAKEN: u64 = 3;

#[inline]
fn tag(state: u64) -> u64 {
    state & TAG_MASK
}

#[inline]
fn with_tag(state: u64, tag: u64) -> u64 {
    (state & !TAG_MASK) | tag
}

#[inline]
fn next_claim(state: u64) -> u64 {
    ((state >> TAG_BITS).wrapping_add(1) << TAG_BITS) | CLAIMED
}

#[derive(Debug)]
struct Slot {
    state: AtomicU64,
    value: AtomicI64,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU64::new(FREE),
            value: AtomicI64::new(0),
        }
    }
}

/// A fixed-size array of rendezvous slots shared by the pushers and poppers of one stack.
#[derive(Debug)]
pub struct EliminationArray {
    slots: Box<[CachePadded<Slot>]>,
    config: ElimConfig,
}

impl Default for EliminationArray {
    fn default() -> Self {
        Self::build(ElimConfig::default())
    }
}

impl EliminationArray {
    /// Creates an array with the given configuration.
    pub fn new(config: ElimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ElimConfig) -> Self {
        Self {
            slots: (0..config.slots)
                .map(|_| CachePadded::new(Slot::new()))
                .collect(),
            config,
        }
    }

    /// The configuration the array was built with.
    pub fn config(&self) -> &ElimConfig {
        &self.config
    }

    /// Resets every slot to free.
    ///
    /// Takes `&mut self`: no rendezvous can be in flight.
    pub fn init(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot.state.get_mut() = FREE;
            *slot.value.get_mut() = 0;
        }
    }

    /// Number of slots that are currently free.
    pub fn free_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| tag(slot.state.load(Ordering::Relaxed)) == FREE)
            .count()
    }

    fn random_slot(&self) -> &Slot {
        &self.slots[thread_rng().gen_range(0..self.slots.len())]
    }

    /// Offers `value` to a popper.
    ///
    /// Returns `true` if a popper took it, in which case the push is complete. Returns `false` if
    /// no free slot was found or nobody took the value before the timeout; the value has then
    /// been withdrawn and the caller still owns the push.
    pub fn exchange_push(&self, value: Value) -> bool {
        let deadline = Instant::now() + self.config.timeout;
        let backoff = Backoff::new();

        let (slot, claimed) = loop {
            let slot = self.random_slot();
            let state = slot.state.load(Ordering::Relaxed);
            if tag(state) == FREE {
                let claimed = next_claim(state);
                if slot
                    .state
                    .compare_exchange(state, claimed, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    break (slot, claimed);
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            backoff.snooze();
        };

        slot.value.store(value, Ordering::Relaxed);
        let offered = with_tag(claimed, OFFERED);
        let taken = with_tag(claimed, TAKEN);
        let free = with_tag(claimed, FREE);
        // Publishes `value` to the popper that observes `OFFERED`.
        slot.state.store(offered, Ordering::Release);

        backoff.reset();
        while Instant::now() < deadline {
            if slot.state.load(Ordering::Acquire) == taken {
                slot.state.store(free, Ordering::Release);
                tracing::trace!(value, "push eliminated");
                return true;
            }
            backoff.snooze();
        }

        match slot
            .state
            .compare_exchange(offered, free, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::trace!(value, "elimination push timed out");
                false
            }
            Err(current) => {
                // A popper won the race against the withdrawal.
                debug_assert_eq!(current, taken);
                slot.state.store(free, Ordering::Release);
                tracing::trace!(value, "push eliminated");
                true
            }
        }
    }

    /// Looks for a pusher's offer until the timeout.
    ///
    /// Returns the value of the push it paired with, which completes both operations.
    pub fn exchange_pop(&self) -> Option<Value> {
        let deadline = Instant::now() + self.config.timeout;
        let backoff = Backoff::new();

        loop {
            let slot = self.random_slot();
            let state = slot.state.load(Ordering::Acquire);
            if tag(state) == OFFERED {
                let value = slot.value.load(Ordering::Relaxed);
                if slot
                    .state
                    .compare_exchange(
                        state,
                        with_tag(state, TAKEN),
                        // Release orders the `value` read before the pusher frees the slot.
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    tracing::trace!(value, "pop eliminated");
                    return Some(value);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            backoff.snooze();
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::sync::Mutex;
    use std::thread::scope;

    use super::*;

    fn array(slots: usize, timeout: Duration) -> EliminationArray {
        EliminationArray::new(ElimConfig { slots, timeout }).unwrap()
    }

    #[test]
    fn state_packing() {
        let claimed = next_claim(FREE);
        assert_eq!(tag(claimed), CLAIMED);
        assert_eq!(tag(with_tag(claimed, OFFERED)), OFFERED);
        assert_ne!(next_claim(with_tag(claimed, FREE)), claimed);
    }

    #[test]
    fn lonely_push_times_out() {
        let array = array(4, Duration::from_millis(1));
        assert!(!array.exchange_push(5));
        assert_eq!(array.free_slots(), 4);
    }

    #[test]
    fn lonely_pop_times_out() {
        let array = array(4, Duration::from_millis(1));
        assert_eq!(array.exchange_pop(), None);
    }

    #[test]
    fn init_frees_slots() {
        let mut array = array(2, Duration::from_millis(1));
        array.slots[0].state.store(with_tag(next_claim(FREE), OFFERED), Ordering::Relaxed);
        assert_eq!(array.free_slots(), 1);
        array.init();
        assert_eq!(array.free_slots(), 2);
    }

    #[test]
    fn rejects_overflowing_timeout() {
        assert!(EliminationArray::new(ElimConfig {
            slots: 1,
            timeout: Duration::MAX,
        })
        .is_err());
    }

    #[test]
    fn single_slot_reuse_conserves() {
        // Every value is distinct, so a value read from a stale claim shows up as a duplicate.
        const THREADS: i64 = 4;
        const PER_THREAD: i64 = 500;
        let array = array(1, Duration::from_micros(200));
        let pushed = Mutex::new(Vec::new());
        let popped = Mutex::new(Vec::new());

        scope(|s| {
            for t in 0..THREADS {
                let (array, pushed, popped) = (&array, &pushed, &popped);
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let v = t * PER_THREAD + i;
                        if array.exchange_push(v) {
                            pushed.lock().unwrap().push(v);
                        }
                    }
                });
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        if let Some(v) = array.exchange_pop() {
                            popped.lock().unwrap().push(v);
                        }
                    }
                });
            }
        });

        let mut pushed = pushed.into_inner().unwrap();
        let mut popped = popped.into_inner().unwrap();
        pushed.sort_unstable();
        popped.sort_unstable();
        let distinct = popped.len();
        popped.dedup();
        assert_eq!(popped.len(), distinct, "a value was taken twice");
        assert_eq!(pushed, popped);
        assert_eq!(array.free_slots(), 1);
    }

    #[test]
    fn pairs_conserve_values() {
        const PER_THREAD: i64 = 200;
        let array = array(1, Duration::from_millis(5));
        let pushed = Mutex::new(Vec::new());
        let popped = Mutex::new(Vec::new());

        scope(|s| {
            for t in 0..2 {
                let (array, pushed) = (&array, &pushed);
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let v = t * PER_THREAD + i;
                        if array.exchange_push(v) {
                            pushed.lock().unwrap().push(v);
                        }
                    }
                });
            }
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..PER_THREAD {
                        if let Some(v) = array.exchange_pop() {
                            popped.lock().unwrap().push(v);
                        }
                    }
                });
            }
        });

        let mut pushed = pushed.into_inner().unwrap();
        let mut popped = popped.into_inner().unwrap();
        pushed.sort_unstable();
        popped.sort_unstable();
        assert_eq!(pushed, popped);
        assert_eq!(array.free_slots(), 1);
    }
}

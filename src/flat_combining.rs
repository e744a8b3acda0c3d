//! Flat-combining stack and queue.
//!
//! Every operation reserves a record in a shared request log and publishes its request there.
//! Whichever thread holds the combiner lock applies all published requests, in log order, to a
//! private sequential container and wakes the waiters.
//!
//! Hendler, Incze, Shavit and Tzafrir. Flat Combining and the Synchronization-Parallelism
//! Tradeoff. SPAA 2010.

use core::sync::atomic::{AtomicI64, AtomicU8, AtomicUsize, Ordering};
use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::adt::{ConcurrentQueue, ConcurrentStack, Value};
use crate::config::FcConfig;
use crate::error::{Error, Result};

const VACANT: u8 = 0;
const PENDING: u8 = 1;
const DONE_SOME: u8 = 2;
const DONE_NONE: u8 = 3;

/// What a request asks of the sequential container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpKind {
    /// Push or enqueue.
    Insert = 0,
    /// Pop or dequeue.
    Remove = 1,
}

/// A sequential container the combiner applies requests to.
trait Sequential: Default + Send {
    fn insert(&mut self, value: Value);
    fn remove(&mut self) -> Option<Value>;
    fn size(&self) -> usize;
}

impl Sequential for Vec<Value> {
    fn insert(&mut self, value: Value) {
        self.push(value);
    }

    fn remove(&mut self) -> Option<Value> {
        self.pop()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl Sequential for VecDeque<Value> {
    fn insert(&mut self, value: Value) {
        self.push_back(value);
    }

    fn remove(&mut self) -> Option<Value> {
        self.pop_front()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

/// One entry of the request log.
///
/// The owner writes `kind` and `value` before storing `PENDING`; the combiner writes `result`
/// before storing `DONE_*`.
#[derive(Debug)]
struct Record {
    state: AtomicU8,
    kind: AtomicU8,
    value: AtomicI64,
    result: AtomicI64,
}

impl Record {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(VACANT),
            kind: AtomicU8::new(OpKind::Insert as u8),
            value: AtomicI64::new(0),
            result: AtomicI64::new(0),
        }
    }

    fn publish(&self, kind: OpKind, value: Value) {
        self.kind.store(kind as u8, Ordering::Relaxed);
        self.value.store(value, Ordering::Relaxed);
        self.state.store(PENDING, Ordering::Release);
    }

    fn complete(&self, result: Option<Value>) {
        match result {
            Some(v) => {
                self.result.store(v, Ordering::Relaxed);
                self.state.store(DONE_SOME, Ordering::Release);
            }
            None => self.state.store(DONE_NONE, Ordering::Release),
        }
    }

    /// `None` while the request is not applied yet.
    fn outcome(&self) -> Option<Option<Value>> {
        match self.state.load(Ordering::Acquire) {
            DONE_SOME => Some(Some(self.result.load(Ordering::Relaxed))),
            DONE_NONE => Some(None),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Combined<S> {
    container: S,
    /// Index of the first record not yet applied.
    watermark: usize,
}

#[derive(Debug)]
struct FlatCombiner<S> {
    log: Box<[Record]>,
    next: AtomicUsize,
    combined: Mutex<Combined<S>>,
    applied: Condvar,
}

impl<S: Sequential> FlatCombiner<S> {
    fn new(config: FcConfig) -> Self {
        Self {
            log: (0..config.log_capacity).map(|_| Record::new()).collect(),
            next: AtomicUsize::new(0),
            combined: Mutex::new(Combined {
                container: S::default(),
                watermark: 0,
            }),
            applied: Condvar::new(),
        }
    }

    fn capacity(&self) -> usize {
        self.log.len()
    }

    fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.next.load(Ordering::Relaxed))
    }

    fn submit(&self, kind: OpKind, value: Value) -> Result<Option<Value>> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        let Some(record) = self.log.get(index) else {
            tracing::debug!(capacity = self.capacity(), "flat-combining log exhausted");
            return Err(Error::LogFull {
                capacity: self.capacity(),
            });
        };
        record.publish(kind, value);

        let mut combined = self.combined.lock();
        loop {
            if let Some(result) = record.outcome() {
                return Ok(result);
            }
            self.combine(&mut combined);
            if let Some(result) = record.outcome() {
                return Ok(result);
            }
            // An earlier record is reserved but not yet published. Its owner combines next.
            self.applied.wait(&mut combined);
        }
    }

    /// Applies published records from the watermark on, stopping at the first unpublished one.
    fn combine(&self, combined: &mut Combined<S>) {
        let start = combined.watermark;

        while let Some(record) = self.log.get(combined.watermark) {
            if record.state.load(Ordering::Acquire) != PENDING {
                break;
            }
            let result = if record.kind.load(Ordering::Relaxed) == OpKind::Insert as u8 {
                combined
                    .container
                    .insert(record.value.load(Ordering::Relaxed));
                None
            } else {
                combined.container.remove()
            };
            record.complete(result);
            combined.watermark += 1;
        }

        if combined.watermark != start {
            tracing::trace!(
                from = start,
                to = combined.watermark,
                "combining pass applied requests"
            );
            let _ = self.applied.notify_all();
        }
    }

    fn is_empty(&self) -> bool {
        self.combined.lock().container.size() == 0
    }
}

impl<S: Sequential> Default for FlatCombiner<S> {
    fn default() -> Self {
        Self::new(FcConfig::default())
    }
}

fn or_panic<T>(result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    }
}

/// Flat-combining stack.
#[derive(Debug, Default)]
pub struct FcStack {
    combiner: FlatCombiner<Vec<Value>>,
}

impl FcStack {
    /// Creates an empty stack with the default log capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stack with the given configuration.
    pub fn with_config(config: FcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            combiner: FlatCombiner::new(config),
        })
    }

    /// Total number of operations the log can hold.
    pub fn capacity(&self) -> usize {
        self.combiner.capacity()
    }

    /// Number of operations that can still be submitted.
    pub fn remaining(&self) -> usize {
        self.combiner.remaining()
    }

    /// Returns `true` if no values are held.
    pub fn is_empty(&self) -> bool {
        self.combiner.is_empty()
    }

    /// Pushes `value`, or fails if the request log is exhausted.
    pub fn try_push(&self, value: Value) -> Result<()> {
        self.combiner.submit(OpKind::Insert, value).map(|_| ())
    }

    /// Pops the latest value, or fails if the request log is exhausted.
    pub fn try_pop(&self) -> Result<Option<Value>> {
        self.combiner.submit(OpKind::Remove, 0)
    }
}

impl ConcurrentStack for FcStack {
    /// # Panics
    ///
    /// Panics if the request log is exhausted.
    fn push(&self, value: Value) {
        or_panic(self.try_push(value))
    }

    /// # Panics
    ///
    /// Panics if the request log is exhausted.
    fn pop(&self) -> Option<Value> {
        or_panic(self.try_pop())
    }
}

/// Flat-combining queue.
#[derive(Debug, Default)]
pub struct FcQueue {
    combiner: FlatCombiner<VecDeque<Value>>,
}

impl FcQueue {
    /// Creates an empty queue with the default log capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with the given configuration.
    pub fn with_config(config: FcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            combiner: FlatCombiner::new(config),
        })
    }

    /// Total number of operations the log can hold.
    pub fn capacity(&self) -> usize {
        self.combiner.capacity()
    }

    /// Number of operations that can still be submitted.
    pub fn remaining(&self) -> usize {
        self.combiner.remaining()
    }

    /// Returns `true` if no values are held.
    pub fn is_empty(&self) -> bool {
        self.combiner.is_empty()
    }

    /// Enqueues `value`, or fails if the request log is exhausted.
    pub fn try_enqueue(&self, value: Value) -> Result<()> {
        self.combiner.submit(OpKind::Insert, value).map(|_| ())
    }

    /// Dequeues the oldest value, or fails if the request log is exhausted.
    pub fn try_dequeue(&self) -> Result<Option<Value>> {
        self.combiner.submit(OpKind::Remove, 0)
    }
}

impl ConcurrentQueue for FcQueue {
    /// # Panics
    ///
    /// Panics if the request log is exhausted.
    fn enqueue(&self, value: Value) {
        or_panic(self.try_enqueue(value))
    }

    /// # Panics
    ///
    /// Panics if the request log is exhausted.
    fn dequeue(&self) -> Option<Value> {
        or_panic(self.try_dequeue())
    }
}

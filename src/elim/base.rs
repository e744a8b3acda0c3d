use crossbeam_epoch::Guard;

use crate::adt::Value;

/// A stack whose operations can be attempted once, reporting contention instead of retrying.
///
/// This is what the elimination layer wraps: when an attempt fails, it tries to pair the
/// operation with an opposite one through the elimination array before attempting again.
pub trait BaseStack: Default + Send + Sync {
    /// Push request type, built once per push and handed back on every failed attempt.
    type PushReq;

    /// Builds the push request for `value`.
    fn request(value: Value) -> Self::PushReq;

    /// Returns the value carried by `req`.
    fn request_value(req: &Self::PushReq) -> Value;

    /// Tries to push a value to the stack.
    ///
    /// Returns `Ok(())` if the push request is served; `Err(req)` on contention.
    fn try_push(&self, req: Self::PushReq, guard: &Guard) -> Result<(), Self::PushReq>;

    /// Tries to pop a value from the stack.
    ///
    /// Returns `Ok(Some(v))` if `v` is popped; `Ok(None)` if the stack is empty; and `Err(())` on
    /// contention.
    fn try_pop(&self, guard: &Guard) -> Result<Option<Value>, ()>;
}

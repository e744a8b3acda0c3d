use parking_lot::lock_api::RawMutex as _;

use crate::lock::*;

/// The operating system's mutex, parking waiters instead of spinning.
pub struct PlatformLock {
    raw: parking_lot::RawMutex,
}

impl core::fmt::Debug for PlatformLock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlatformLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

impl Default for PlatformLock {
    fn default() -> Self {
        Self {
            raw: parking_lot::RawMutex::INIT,
        }
    }
}

unsafe impl RawLock for PlatformLock {
    type Token = ();

    fn lock(&self) {
        self.raw.lock();
    }

    unsafe fn unlock(&self, _token: ()) {
        // SAFETY: the caller holds the lock.
        unsafe { self.raw.unlock() };
    }
}

unsafe impl RawTryLock for PlatformLock {
    fn try_lock(&self) -> Result<(), ()> {
        if self.raw.try_lock() {
            Ok(())
        } else {
            Err(())
        }
    }
}

//! Single-operation guard shared by the encryptor and decryptor.
//!
//! Each engine object allows one active operation at a time. A controller
//! thread cancels cooperatively: `cancel` latches the cancelled flag and then
//! blocks until the operation thread observes it (at block granularity) and
//! releases the active flag. The latch stays set until `activate` clears it,
//! so a cancelled object refuses new work until explicitly reactivated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub(crate) struct Lifecycle {
    active: Mutex<bool>,
    cancelled: AtomicBool,
    cv: Condvar,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BeginError {
    /// The cancelled latch is set; `activate` has not been called.
    Cancelled,
    /// Another thread currently owns the active flag.
    AlreadyActive,
}

/// Releases the active flag (with condvar notification) when dropped, so the
/// flag is returned on every exit path of the operation thread.
#[derive(Debug)]
pub(crate) struct ActiveGuard<'a>(&'a Lifecycle);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            active: Mutex::new(false),
            cancelled: AtomicBool::new(false),
            cv: Condvar::new(),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, bool> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the active flag for the calling thread.
    pub(crate) fn begin(&self) -> Result<ActiveGuard<'_>, BeginError> {
        let mut active = self.lock_active();
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(BeginError::Cancelled);
        }
        if *active {
            return Err(BeginError::AlreadyActive);
        }
        *active = true;
        Ok(ActiveGuard(self))
    }

    /// Latches the cancelled flag and blocks until no operation is active.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut active = self.lock_active();
        while *active {
            active = self.cv.wait(active).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Clears the cancelled latch. Fails (returns `false`) while an operation
    /// is active.
    pub(crate) fn activate(&self) -> bool {
        let active = self.lock_active();
        if *active {
            return false;
        }
        self.cancelled.store(false, Ordering::SeqCst);
        true
    }

    /// Observed by the operation thread once per block.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.0.lock_active();
        *active = false;
        self.0.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn begin_is_exclusive() {
        let lifecycle = Lifecycle::new();
        let guard = lifecycle.begin().expect("first begin");
        assert_eq!(lifecycle.begin().unwrap_err(), BeginError::AlreadyActive);
        drop(guard);
        lifecycle.begin().expect("begin after release");
    }

    #[test]
    fn cancel_latches_until_activate() {
        let lifecycle = Lifecycle::new();
        lifecycle.cancel();
        assert_eq!(lifecycle.begin().unwrap_err(), BeginError::Cancelled);

        assert!(lifecycle.activate());
        // Repeated activation is a no-op that still succeeds.
        assert!(lifecycle.activate());
        lifecycle.begin().expect("begin after activate");
    }

    #[test]
    fn activate_fails_while_active() {
        let lifecycle = Lifecycle::new();
        let guard = lifecycle.begin().expect("begin");
        assert!(!lifecycle.activate());
        drop(guard);
        assert!(lifecycle.activate());
    }

    #[test]
    fn cancel_blocks_until_operation_exits() {
        let lifecycle = Arc::new(Lifecycle::new());
        let guard = lifecycle.begin().expect("begin");

        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            std::thread::spawn(move || {
                lifecycle.cancel();
                // cancel() must only return once the active flag is clear.
                assert_eq!(lifecycle.begin().unwrap_err(), BeginError::Cancelled);
            })
        };

        // Give the waiter a moment to block on the condvar, then observe the
        // latch from the operation thread and release the flag.
        while !lifecycle.is_cancelled() {
            std::thread::yield_now();
        }
        drop(guard);
        waiter.join().expect("cancel thread");
    }
}

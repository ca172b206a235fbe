//! src/pipeline/signal.rs
//!
//! Resume signal shared by the coordinator and its workers.
//!
//! The coordinator sets the signal while a consumer is waiting in `get_batch`
//! and clears it once the batch is assembled. Workers parked at the high-water
//! mark wait on it together with their own stop condition; `wake` makes them
//! re-check that condition without raising the signal.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ResumeSignal {
    state: Mutex<bool>,
    cond: Condvar,
}

impl ResumeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal and wakes every waiting worker.
    pub fn set(&self) {
        *self.lock() = true;
        self.cond.notify_all();
    }

    /// Sets the signal until the returned guard is dropped.
    pub fn raise(&self) -> RaisedSignal<'_> {
        self.set();
        RaisedSignal { signal: self }
    }

    pub fn clear(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Wakes every waiting worker without setting the signal.
    ///
    /// The lock is taken before notifying, so a waiter that checked its stop
    /// condition just before cannot miss the wakeup.
    pub fn wake(&self) {
        let _state = self.lock();
        self.cond.notify_all();
    }

    /// Blocks until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was set when the wait ended.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_timeout_or(timeout, || false)
    }

    /// Like [`wait_timeout`](Self::wait_timeout), but also returns once `stop`
    /// holds. `stop` is checked under the lock on every wakeup, so it must be
    /// made true before calling [`wake`](Self::wake).
    pub fn wait_timeout_or(&self, timeout: Duration, stop: impl Fn() -> bool) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |set| !*set && !stop())
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    // A panicking holder cannot leave the bool half-written, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears its [`ResumeSignal`] when dropped.
#[must_use = "the signal is cleared as soon as the guard is dropped"]
pub struct RaisedSignal<'a> {
    signal: &'a ResumeSignal,
}

impl Drop for RaisedSignal<'_> {
    fn drop(&mut self) {
        self.signal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_set_and_clear() {
        let signal = ResumeSignal::new();
        assert!(!signal.is_set());
        signal.set();
        assert!(signal.is_set());
        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn test_raise_clears_on_drop() {
        let signal = ResumeSignal::new();
        {
            let _raised = signal.raise();
            assert!(signal.is_set());
        }
        assert!(!signal.is_set());
    }

    #[test]
    fn test_wait_times_out_when_unset() {
        let signal = ResumeSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_returns_immediately_when_set() {
        let signal = ResumeSignal::new();
        signal.set();
        assert!(signal.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_set_wakes_waiter() {
        let signal = Arc::new(ResumeSignal::new());
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait_timeout(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.set();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_wake_releases_stopped_waiter() {
        let signal = Arc::new(ResumeSignal::new());
        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let signal = signal.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let set = signal.wait_timeout_or(Duration::from_secs(10), || {
                    stop.load(Ordering::Acquire)
                });
                (set, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
        signal.wake();

        let (set, waited) = waiter.join().unwrap();
        assert!(!set);
        assert!(waited < Duration::from_secs(5), "waited {:?}", waited);
    }

    #[test]
    fn test_wake_alone_keeps_waiting() {
        let signal = ResumeSignal::new();
        signal.wake();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}

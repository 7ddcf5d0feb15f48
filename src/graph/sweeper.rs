//! Expiry scheduling.
//!
//! One background thread holds at most one armed deadline, always the
//! earliest expiration among active links. Every store mutation re-arms it;
//! there is no periodic polling. When the deadline passes the thread runs the
//! purge callback, which returns the next deadline to arm.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

struct State {
    deadline: Option<DateTime<Utc>>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    signal: Condvar,
}

pub(crate) struct Sweeper {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawns the sweeper thread. `purge` removes expired links and returns
    /// the next deadline to wait for, if any.
    pub fn spawn<F>(purge: F) -> Self
    where
        F: Fn() -> Option<DateTime<Utc>> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                deadline: None,
                shutdown: false,
            }),
            signal: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            let mut state = thread_shared
                .state
                .lock()
                .expect("sweeper state poisoned");
            loop {
                if state.shutdown {
                    return;
                }
                match state.deadline {
                    None => {
                        state = thread_shared
                            .signal
                            .wait(state)
                            .expect("sweeper state poisoned");
                    }
                    Some(deadline) => {
                        let now = Utc::now();
                        if deadline <= now {
                            state.deadline = None;
                            drop(state);
                            let next = purge();
                            state = thread_shared
                                .state
                                .lock()
                                .expect("sweeper state poisoned");
                            // A re-arm may have landed during the purge;
                            // the earlier deadline wins.
                            state.deadline = match (state.deadline, next) {
                                (Some(a), Some(b)) => Some(a.min(b)),
                                (a, b) => a.or(b),
                            };
                        } else {
                            let wait = (deadline - now).to_std().unwrap_or_default();
                            let (guard, _) = thread_shared
                                .signal
                                .wait_timeout(state, wait)
                                .expect("sweeper state poisoned");
                            state = guard;
                        }
                    }
                }
            }
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Replaces the armed deadline. The old deadline is gone before the new
    /// one becomes observable; at most one timer is ever pending.
    pub fn arm(&self, deadline: Option<DateTime<Utc>>) {
        {
            let mut state = self.shared.state.lock().expect("sweeper state poisoned");
            state.deadline = deadline;
        }
        self.shared.signal.notify_one();
    }

    /// Stops the sweeper thread and waits for it to exit.
    pub fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            let mut state = self.shared.state.lock().expect("sweeper state poisoned");
            state.shutdown = true;
        }
        self.shared.signal.notify_one();
        let _ = handle.join();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    #[test]
    fn test_fires_after_deadline() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let sweeper = Sweeper::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        sweeper.arm(Some(Utc::now() + Duration::milliseconds(30)));
        std::thread::sleep(StdDuration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let sweeper = Sweeper::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        // Push the deadline out, then disarm entirely.
        sweeper.arm(Some(Utc::now() + Duration::milliseconds(50)));
        sweeper.arm(None);
        std::thread::sleep(StdDuration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_teardown_joins_without_firing() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let mut sweeper = Sweeper::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        sweeper.arm(Some(Utc::now() + Duration::seconds(60)));
        sweeper.teardown();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}

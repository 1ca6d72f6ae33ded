//! Recurring trim timer with synchronous cancellation
//!
//! Each timer owns one named thread that sleeps on a condition variable
//! between ticks. Cancelling sets the stop flag under the same mutex the
//! thread waits on, wakes it, and joins it, so once [`TrimTimer::cancel`]
//! returns the callback can never run again.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{CacheError, Result};

#[derive(Debug)]
struct TimerState {
    cancelled: Mutex<bool>,
    wake: Condvar,
    ticks: AtomicU64,
}

/// Handle to a running trim timer
#[derive(Debug)]
pub struct TrimTimer {
    state: Arc<TimerState>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl TrimTimer {
    /// Start calling `tick` every `interval` on a dedicated thread
    ///
    /// The timer reschedules itself after every tick until it is cancelled
    /// or `tick` returns `false`.
    pub fn start<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let state = Arc::new(TimerState {
            cancelled: Mutex::new(false),
            wake: Condvar::new(),
            ticks: AtomicU64::new(0),
        });

        let thread_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let mut cancelled = thread_state.cancelled.lock();
                let mut deadline = Instant::now() + interval;
                loop {
                    if *cancelled {
                        break;
                    }
                    if !thread_state.wake.wait_until(&mut cancelled, deadline).timed_out() {
                        // cancelled or spurious wakeup; re-check and keep the deadline
                        continue;
                    }
                    if *cancelled {
                        break;
                    }

                    let keep_going = MutexGuard::unlocked(&mut cancelled, &mut tick);
                    thread_state.ticks.fetch_add(1, Ordering::Relaxed);
                    if !keep_going {
                        break;
                    }
                    deadline = Instant::now() + interval;
                }
            })
            .map_err(|e| CacheError::timer(e, "failed to spawn trim timer"))?;

        Ok(Self {
            state,
            thread: Some(thread),
            interval,
        })
    }

    /// Stop the timer and wait until its thread has exited
    ///
    /// Called from within the timer's own callback, this only marks the
    /// timer cancelled; the thread exits right after the current tick.
    pub fn cancel(&mut self) {
        *self.state.cancelled.lock() = true;
        self.state.wake.notify_all();

        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                log::warn!("trim timer thread panicked");
            }
        }
    }

    /// Whether the timer thread may still run ticks
    pub fn is_active(&self) -> bool {
        self.thread.is_some() && !*self.state.cancelled.lock()
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.state.ticks.load(Ordering::Relaxed)
    }

    /// Configured period
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for TrimTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

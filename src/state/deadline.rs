//! Cancellable countdowns that resolve exactly once.
//!
//! Every armed deadline carries a single-assignment resolution flag. The timer
//! task and [`DeadlineHandle::cancel`] both race to claim it; whoever claims it
//! first wins and the other side becomes a no-op. The expiry callback therefore
//! runs at most once and never after a cancellation that won the race.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use tokio::{task::AbortHandle, time::sleep};

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable resolution of a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineStatus {
    /// The countdown is still running.
    Armed,
    /// The countdown elapsed and the expiry callback was (or is being) invoked.
    Fired,
    /// The deadline was cancelled before it could fire.
    Cancelled,
}

#[derive(Debug)]
struct ResolutionFlag(AtomicU8);

impl ResolutionFlag {
    fn new() -> Self {
        Self(AtomicU8::new(ARMED))
    }

    fn claim(&self, outcome: u8) -> bool {
        self.0
            .compare_exchange(ARMED, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn status(&self) -> DeadlineStatus {
        match self.0.load(Ordering::Acquire) {
            ARMED => DeadlineStatus::Armed,
            FIRED => DeadlineStatus::Fired,
            _ => DeadlineStatus::Cancelled,
        }
    }
}

/// Arms countdowns on the current tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineScheduler;

impl DeadlineScheduler {
    /// Create a scheduler bound to the ambient tokio runtime.
    pub fn new() -> Self {
        Self
    }

    /// Start a countdown of `duration`; `on_expire` runs if nothing cancels it first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, duration: Duration, on_expire: F) -> DeadlineHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let flag = Arc::new(ResolutionFlag::new());
        let timer_flag = Arc::clone(&flag);
        let task = tokio::spawn(async move {
            sleep(duration).await;
            if timer_flag.claim(FIRED) {
                on_expire();
            }
        });

        DeadlineHandle {
            flag,
            task: task.abort_handle(),
        }
    }

    /// Cancel `handle`, returning `true` when the cancellation won the race.
    pub fn cancel(&self, handle: &DeadlineHandle) -> bool {
        handle.cancel()
    }
}

/// Handle to a single armed countdown. Dropping it cancels the countdown.
#[derive(Debug)]
pub struct DeadlineHandle {
    flag: Arc<ResolutionFlag>,
    task: AbortHandle,
}

impl DeadlineHandle {
    /// Try to cancel the countdown.
    ///
    /// Returns `true` if the deadline had not fired yet; the callback will then
    /// never run. Returns `false` if it already fired or was already cancelled.
    pub fn cancel(&self) -> bool {
        let won = self.flag.claim(CANCELLED);
        if won {
            self.task.abort();
        }
        won
    }

    /// Current resolution of the countdown.
    pub fn status(&self) -> DeadlineStatus {
        self.flag.status()
    }

    /// Whether the countdown elapsed before any cancellation.
    pub fn has_fired(&self) -> bool {
        self.status() == DeadlineStatus::Fired
    }
}

impl Drop for DeadlineHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Periodic tick sources for the exam countdown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest period `TokioScheduler` will run at; a zero interval is raised to it.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked on every tick.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Schedules a callback to run repeatedly until the returned handle is cancelled.
pub trait TickScheduler: Send + Sync {
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TickHandle;
}

/// Cancels a repeating schedule. Dropping the handle cancels it too.
pub struct TickHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TickHandle {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Runs callbacks on the Tokio timer, one spawned task per schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TickScheduler for TokioScheduler {
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    fn schedule_repeating(&self, interval: Duration, mut callback: TickCallback) -> TickHandle {
        if interval < MIN_TICK_INTERVAL {
            log::warn!("tick interval {interval:?} is too short, using {MIN_TICK_INTERVAL:?}");
        }
        let interval = interval.max(MIN_TICK_INTERVAL);
        let task = tokio::spawn(async move {
            // First tick fires one full interval after scheduling.
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        let abort = task.abort_handle();
        TickHandle::new(move || abort.abort())
    }
}

/// Scheduler driven by hand, for deterministic tests and step-through tools.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    callbacks: BTreeMap<u64, TickCallback>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of schedules that have not been cancelled.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner.lock().map_or(0, |state| state.callbacks.len())
    }

    /// Invoke every active callback once.
    pub fn fire(&self) {
        if let Ok(mut state) = self.inner.lock() {
            for callback in state.callbacks.values_mut() {
                callback();
            }
        }
    }

    /// Invoke every active callback `count` times.
    pub fn fire_n(&self, count: usize) {
        for _ in 0..count {
            self.fire();
        }
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule_repeating(&self, _interval: Duration, callback: TickCallback) -> TickHandle {
        let id = match self.inner.lock() {
            Ok(mut state) => {
                let id = state.next_id;
                state.next_id += 1;
                state.callbacks.insert(id, callback);
                id
            }
            Err(_) => return TickHandle::new(|| {}),
        };
        let inner = Arc::clone(&self.inner);
        TickHandle::new(move || {
            if let Ok(mut state) = inner.lock() {
                state.callbacks.remove(&id);
            }
        })
    }
}

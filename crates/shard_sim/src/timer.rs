//! Repeating background timers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shard_model::ShardError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::clock::{Clock, after};

/// What a timer should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Owns a running timer. Dropping the handle stops the timer.
#[derive(Debug)]
pub struct TimerHandle {
    name: String,
    task: JoinHandle<()>,
}

impl TimerHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the timer. A tick already in progress runs to completion.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Returns `true` once the timer has stopped, by itself or via [`stop`].
    ///
    /// [`stop`]: TimerHandle::stop
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `tick` after `initial_delay`, then every `period`, until it returns
/// [`Tick::Stop`] or the handle is dropped.
///
/// Deadlines follow a fixed schedule (`start + initial_delay + k * period`),
/// so when the clock jumps past several deadlines at once every missed tick
/// is replayed. The callback receives the scheduled instant of its tick.
///
/// A tick that fails or panics is logged and skipped; the timer keeps
/// running. A zero `period` makes the timer fire once.
pub fn spawn_repeating<F>(
    clock: Arc<dyn Clock>,
    name: impl Into<String>,
    initial_delay: Duration,
    period: Duration,
    mut tick: F,
) -> TimerHandle
where
    F: FnMut(DateTime<Utc>) -> Result<Tick, ShardError> + Send + 'static,
{
    let name = name.into();
    let timer = name.clone();
    let task = tokio::spawn(async move {
        let mut deadline = after(clock.now(), initial_delay);
        loop {
            clock.delay_until(deadline).await;
            match std::panic::catch_unwind(AssertUnwindSafe(|| tick(deadline))) {
                Ok(Ok(Tick::Continue)) => {}
                Ok(Ok(Tick::Stop)) => {
                    debug!(timer = %timer, "timer stopped itself");
                    break;
                }
                Ok(Err(err)) => warn!(timer = %timer, error = %err, "timer tick failed, skipping"),
                Err(_) => error!(timer = %timer, "timer tick panicked, skipping"),
            }
            if period.is_zero() {
                break;
            }
            deadline = after(deadline, period);
        }
    });
    TimerHandle { name, task }
}

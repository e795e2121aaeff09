//! Time sources.
//!
//! Everything in the simulation reads time and sleeps through a [`Clock`],
//! so tests can replace wall time with a [`ManualClock`] and step through
//! minutes of game time instantly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;

/// Number of scheduler yields [`ManualClock::advance`] performs so that woken
/// tasks run before it returns.
const SETTLE_YIELDS: usize = 64;

/// A source of "now" that can suspend until a deadline.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend until `deadline`. Returns immediately if it has passed.
    async fn delay_until(&self, deadline: DateTime<Utc>);

    /// Suspend for `duration`.
    async fn delay(&self, duration: Duration) {
        let deadline = after(self.now(), duration);
        self.delay_until(deadline).await;
    }
}

/// `at + duration`, saturating at the latest representable instant.
#[must_use]
pub fn after(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `at - duration`, saturating at the earliest representable instant.
#[must_use]
pub fn before(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ── Wall clock ──────────────────────────────────────────────────────────────

/// Wall time anchored at construction and advanced by tokio's monotonic
/// clock, so a paused tokio runtime pauses it too.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A clock that reads `origin` right now.
    #[must_use]
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        after(self.origin, self.started.elapsed())
    }

    async fn delay_until(&self, deadline: DateTime<Utc>) {
        let remaining = (deadline - self.now()).to_std().unwrap_or(Duration::ZERO);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}

// ── Manual clock ────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
///
/// Sleepers are woken as soon as the synthetic time reaches their deadline.
/// Time never moves backwards.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<watch::Sender<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        let (now, _) = watch::channel(start);
        Self { now: Arc::new(now) }
    }

    /// Jump to `at` if it is later than the current time.
    pub fn set(&self, at: DateTime<Utc>) {
        self.now.send_if_modified(|now| {
            if at > *now {
                *now = at;
                true
            } else {
                false
            }
        });
    }

    /// Move time forward by `duration` and let woken tasks run.
    pub async fn advance(&self, duration: Duration) {
        self.now.send_modify(|now| *now = after(*now, duration));
        Self::settle().await;
    }

    /// Yield to the runtime until freshly woken tasks have had a chance to
    /// run to their next suspension point.
    pub async fn settle() {
        for _ in 0..SETTLE_YIELDS {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }

    async fn delay_until(&self, deadline: DateTime<Utc>) {
        let mut rx = self.now.subscribe();
        // The sender lives as long as `self`, so this only fails on shutdown.
        let _ = rx.wait_for(|now| *now >= deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_after_saturates() {
        assert_eq!(after(DateTime::<Utc>::MAX_UTC, Duration::from_secs(1)), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            after(epoch(), Duration::from_secs(90)),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap()
        );
        assert_eq!(before(epoch(), Duration::from_secs(0)), epoch());
    }

    #[tokio::test]
    async fn test_manual_clock_wakes_sleepers_at_deadline() {
        let clock = ManualClock::new(epoch());
        let sleeper = {
            let clock = clock.clone();
            tokio::spawn(async move { clock.delay(Duration::from_secs(10)).await })
        };
        ManualClock::settle().await;

        clock.advance(Duration::from_secs(9)).await;
        assert!(!sleeper.is_finished());

        clock.advance(Duration::from_secs(1)).await;
        assert!(sleeper.is_finished());
    }

    #[tokio::test]
    async fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(epoch());
        clock.set(after(epoch(), Duration::from_secs(5)));
        clock.set(epoch());
        assert_eq!(clock.now(), after(epoch(), Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_system_clock_starts_at_origin() {
        let clock = SystemClock::starting_at(epoch());
        let elapsed = clock.now() - epoch();
        assert!(elapsed >= chrono::Duration::zero());
        assert!(elapsed < chrono::Duration::seconds(5));
    }
}

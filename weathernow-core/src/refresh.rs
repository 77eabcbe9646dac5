//! Single-slot periodic refresh.

use std::{future, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::model::LookupTarget;

/// Identity of an installed refresh timer.
pub type RefreshHandleId = u64;

#[derive(Debug)]
struct RefreshHandle {
    id: RefreshHandleId,
    target: LookupTarget,
    interval: Interval,
}

/// Owns at most one repeating timer.
///
/// Installing a new target drops the previous handle first, which is what
/// cancels it: there is never a second interval alive to fire.
#[derive(Debug)]
pub struct RefreshScheduler {
    period: Duration,
    next_id: RefreshHandleId,
    slot: Option<RefreshHandle>,
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_id: 1,
            slot: None,
        }
    }

    /// Cancel the active timer (if any) and install one for `target`.
    ///
    /// The first tick comes one full period after the reset.
    pub fn reset(&mut self, target: LookupTarget) -> RefreshHandleId {
        if let Some(old) = self.slot.take() {
            tracing::debug!(handle = old.id, target = %old.target, "refresh timer cancelled");
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(handle = id, %target, period = ?self.period, "refresh timer installed");
        self.slot = Some(RefreshHandle {
            id,
            target,
            interval,
        });
        id
    }

    pub fn cancel(&mut self) {
        if let Some(old) = self.slot.take() {
            tracing::debug!(handle = old.id, "refresh timer cancelled");
        }
    }

    pub fn active_target(&self) -> Option<&LookupTarget> {
        self.slot.as_ref().map(|h| &h.target)
    }

    pub fn active_handle(&self) -> Option<RefreshHandleId> {
        self.slot.as_ref().map(|h| h.id)
    }

    /// Wait for the next tick and yield the captured target.
    ///
    /// Never resolves while no timer is installed. Cancel-safe.
    pub async fn tick(&mut self) -> LookupTarget {
        match self.slot.as_mut() {
            Some(handle) => {
                handle.interval.tick().await;
                tracing::debug!(handle = handle.id, target = %handle.target, "refresh tick");
                handle.target.clone()
            }
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;
    use tokio::time::timeout;

    const PERIOD: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let start = Instant::now();
        scheduler.reset(LookupTarget::city("Berlin"));

        assert_eq!(scheduler.tick().await, LookupTarget::city("Berlin"));
        assert_eq!(start.elapsed(), PERIOD);

        assert_eq!(scheduler.tick().await, LookupTarget::city("Berlin"));
        assert_eq!(start.elapsed(), PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_replaces_previous_timer() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let first = scheduler.reset(LookupTarget::city("Berlin"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let second = scheduler.reset(LookupTarget::city("Madrid"));
        assert_ne!(first, second);
        assert_eq!(scheduler.active_handle(), Some(second));

        // Berlin would have fired at t=60s; only Madrid fires, at t=90s.
        let start = Instant::now();
        assert_eq!(scheduler.tick().await, LookupTarget::city("Madrid"));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn coordinates_are_captured_not_resampled() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        let target = LookupTarget::coords(Coordinates::new(35.6762, 139.6503));
        scheduler.reset(target.clone());

        for _ in 0..3 {
            assert_eq!(scheduler.tick().await, target);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_scheduler_never_ticks() {
        let mut scheduler = RefreshScheduler::new(PERIOD);
        scheduler.reset(LookupTarget::city("Lima"));
        scheduler.cancel();

        assert_eq!(scheduler.active_target(), None);
        assert!(timeout(PERIOD * 3, scheduler.tick()).await.is_err());
    }
}

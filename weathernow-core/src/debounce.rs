//! Quiet-period debouncing for free-text input.

use std::{future, time::Duration};

use tokio::time::{Instant, sleep_until};

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Holds the latest input until `delay` passes without a newer one.
///
/// The debouncer owns the settled value. A settle that lands on the value
/// already held is swallowed, so consumers only hear about changes.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    current: T,
    pending: Option<Pending<T>>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            current: initial,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some(Pending {
            value,
            deadline: Instant::now() + self.delay,
        });
    }

    /// Drop the pending emission, returning the value that was waiting.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Last settled value.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Resolve with the next changed value once its quiet period elapses.
    ///
    /// Never resolves while nothing is pending. Cancel-safe: dropping the
    /// future leaves the pending value in place.
    pub async fn settled(&mut self) -> T {
        loop {
            let Some(deadline) = self.pending.as_ref().map(|p| p.deadline) else {
                return future::pending().await;
            };
            sleep_until(deadline).await;

            let Some(pending) = self.pending.take() else {
                continue;
            };
            if pending.value != self.current {
                self.current = pending.value.clone();
                return pending.value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    const DELAY: Duration = Duration::from_millis(550);

    #[tokio::test(start_paused = true)]
    async fn emits_after_quiet_period() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let start = Instant::now();

        debouncer.push("London".to_string());
        let value = debouncer.settled().await;

        assert_eq!(value, "London");
        assert_eq!(start.elapsed(), DELAY);
        assert_eq!(debouncer.current(), "London");
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_emits_only_final_value() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let start = Instant::now();

        for prefix in ["L", "Lo", "Lon", "Lond", "Londo", "London"] {
            debouncer.push(prefix.to_string());
            // Shorter than the delay: every push supersedes the last.
            let early = timeout(Duration::from_millis(200), debouncer.settled()).await;
            assert!(early.is_err(), "emitted {early:?} mid-burst");
        }

        assert_eq!(debouncer.settled().await, "London");
        // Last push landed at t=1000ms.
        assert_eq!(start.elapsed(), Duration::from_millis(1000) + DELAY);
        assert!(
            timeout(Duration::from_secs(5), debouncer.settled())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_value_is_swallowed() {
        let mut debouncer = Debouncer::new("Paris".to_string(), DELAY);

        debouncer.push("Pari".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.push("Paris".to_string());

        assert!(
            timeout(Duration::from_secs(2), debouncer.settled())
                .await
                .is_err()
        );
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_emission() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.push("Rome".to_string());

        assert_eq!(debouncer.cancel().as_deref(), Some("Rome"));
        assert!(
            timeout(Duration::from_secs(2), debouncer.settled())
                .await
                .is_err()
        );
        assert_eq!(debouncer.current(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_debouncer_never_resolves() {
        let mut debouncer: Debouncer<String> = Debouncer::new(String::new(), DELAY);
        assert!(
            timeout(Duration::from_secs(60), debouncer.settled())
                .await
                .is_err()
        );
    }
}

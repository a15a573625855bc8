//! Periodic tick task driving the window scheduler.
//!
//! One tokio task owns the only recurring work: once per second it takes
//! the scheduler lock and lets the state machine observe the clock.
//! Cancellation is deterministic; the select below polls the token before
//! the interval, so no tick body runs after cancellation is requested.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::scheduler::SharedScheduler;

/// Configuration for the tick task.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Interval between scheduler ticks (default: 1 second).
    pub tick_interval: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Spawns the countdown tick task.
///
/// Returns a CancellationToken that can be used to stop the task.
pub fn spawn_tick_task(scheduler: SharedScheduler, config: TickerConfig) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        run_tick_loop(scheduler, config, cancel_clone).await;
    });

    cancel
}

/// Main tick loop.
async fn run_tick_loop(scheduler: SharedScheduler, config: TickerConfig, cancel: CancellationToken) {
    let mut ticker = interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_ms = config.tick_interval.as_millis() as u64,
        "countdown tick task started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("countdown tick task shutting down");
                break;
            }
            _ = ticker.tick() => {
                scheduler.lock().await.on_tick();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::scheduler::{Clock, WindowScheduler};
    use crate::store::MemorySecretStore;
    use crate::ticker::{spawn_tick_task, TickerConfig};

    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    #[derive(Clone, Default)]
    struct MockClock(Arc<AtomicU64>);

    impl MockClock {
        fn set(&self, now: u64) {
            self.0.store(now, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now_unix(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn fast_ticker() -> TickerConfig {
        TickerConfig {
            tick_interval: Duration::from_millis(5),
        }
    }

    fn shared_scheduler_at(now: u64) -> (crate::scheduler::SharedScheduler, MockClock) {
        let clock = MockClock::default();
        clock.set(now);
        let mut scheduler = WindowScheduler::new(
            Arc::new(clock.clone()),
            Box::new(MemorySecretStore::default()),
        );
        scheduler.set_secret(SECRET);
        (Arc::new(tokio::sync::Mutex::new(scheduler)), clock)
    }

    #[tokio::test]
    async fn ticks_rederive_after_the_window_elapses() {
        let (scheduler, clock) = shared_scheduler_at(59);
        let cancel = spawn_tick_task(scheduler.clone(), fast_ticker());

        assert_eq!(
            "996554",
            scheduler.lock().await.current_code().unwrap().to_string()
        );

        clock.set(89);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            "602287",
            scheduler.lock().await.current_code().unwrap().to_string()
        );

        cancel.cancel();
    }

    #[tokio::test]
    async fn cancellation_stops_all_ticks() {
        let (scheduler, clock) = shared_scheduler_at(59);
        let cancel = spawn_tick_task(scheduler.clone(), fast_ticker());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The window elapsed, but with the task cancelled nothing may
        // derive a fresh code
        clock.set(89);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            "996554",
            scheduler.lock().await.current_code().unwrap().to_string()
        );
    }
}

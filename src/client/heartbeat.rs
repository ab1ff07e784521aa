//! Heartbeat timer
//!
//! Owned by the connection task and polled inside its event loop, so ticks
//! run on the same task that owns the socket. Stopping just drops the
//! interval: there is never a firing in flight to wait for.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// Delay before the first ping after a connection is established.
pub const HEARTBEAT_INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct HeartbeatScheduler {
    initial_delay: Duration,
    period: Duration,
    ticker: Option<Interval>,
}

impl HeartbeatScheduler {
    pub fn new(period: Duration) -> Self {
        Self::with_initial_delay(HEARTBEAT_INITIAL_DELAY, period)
    }

    pub fn with_initial_delay(initial_delay: Duration, period: Duration) -> Self {
        Self {
            initial_delay,
            period,
            ticker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Replaces any running schedule with a fresh one.
    pub fn start(&mut self) {
        self.stop();

        let mut ticker = interval_at(Instant::now() + self.initial_delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);

        info!(
            initial_delay_ms = self.initial_delay.as_millis() as u64,
            period_secs = self.period.as_secs(),
            "heartbeat scheduled"
        );
    }

    /// Cancels the schedule. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.ticker.take().is_some();
        if was_running {
            debug!("heartbeat cancelled");
        }
        was_running
    }

    /// Resolves at the next firing; never resolves while stopped.
    ///
    /// Cancel safe, so it can sit in a `select!` loop.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

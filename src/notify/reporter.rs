//! Periodic frontier size reports
//!
//! The reporter tells the operator how large the frontier has grown, once at
//! startup and then on a fixed period until the harvest is stopped.

use crate::crawler::Lifecycle;
use crate::notify::{deliver, Notification, Notifier};
use crate::state::CrawlMode;
use crate::storage::FrontierStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Periodic frontier size report
///
/// Runs until a stop is requested. It does not wait for the traversal to
/// complete; the last report is simply the last one before the stop.
pub struct Reporter {
    notifier: Arc<dyn Notifier>,
    frontier: Arc<dyn FrontierStore>,
    mode: CrawlMode,
    period: Duration,
}

impl Reporter {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        frontier: Arc<dyn FrontierStore>,
        mode: CrawlMode,
        period: Duration,
    ) -> Self {
        Self {
            notifier,
            frontier,
            mode,
            period,
        }
    }

    /// Reports once immediately, then every period until stopped
    pub async fn run(self, lifecycle: Lifecycle) {
        self.report().await;

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = lifecycle.stopped() => break,
                _ = ticker.tick() => self.report().await,
            }
        }

        tracing::debug!("Reporter stopped");
    }

    async fn report(&self) {
        let body = match self.frontier.count() {
            Ok(count) => format!("{} harvest: {} identifiers in the frontier", self.mode, count),
            Err(e) => format!("{} harvest: frontier size unavailable: {}", self.mode, e),
        };
        deliver(self.notifier.as_ref(), &Notification::new("frontier size", body)).await;
    }
}

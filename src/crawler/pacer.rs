//! Fixed-period request pacing
//!
//! Ticks sit on a grid anchored at the first `wait()`. Time spent between
//! waits does not push later ticks back, and a stall that overruns several
//! ticks resumes at the next grid point instead of firing the missed ones.

use tokio::time::{sleep_until, Duration, Instant};

/// Fixed-interval rate limiter for outbound requests
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    next_tick: Option<Instant>,
}

impl Pacer {
    /// Creates a pacer ticking every `period`
    ///
    /// The pacing floor is applied by the config layer; a zero period is
    /// bumped to one millisecond so the grid always advances.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_tick: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next tick
    ///
    /// The first call returns immediately.
    pub async fn wait(&mut self) {
        let now = Instant::now();
        let deadline = match self.next_tick {
            None => now,
            Some(tick) if tick >= now => tick,
            Some(tick) => {
                // Missed ticks are skipped, never burst
                let behind = now.duration_since(tick).as_nanos();
                let period = self.period.as_nanos();
                let skipped = (behind + period - 1) / period;
                tick + Duration::from_nanos((skipped * period) as u64)
            }
        };

        if deadline > now {
            sleep_until(deadline).await;
        }
        self.next_tick = Some(deadline + self.period);
    }
}

//! Countdown clock driving a session.
//!
//! [`Ticker`] yields one simulated second per period. Production runs at one
//! tick per real second; a shorter period plays the test back faster.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Real time between ticks in production.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Simulated seconds reported by each tick.
pub const SECONDS_PER_TICK: u32 = 1;

/// Cancellable periodic tick source.
#[derive(Debug)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    /// Start ticking; the first tick arrives one period from now.
    pub fn start(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    /// Wait for the next tick. Returns `None` immediately once cancelled.
    pub async fn tick(&mut self) -> Option<u32> {
        let interval = self.interval.as_mut()?;
        interval.tick().await;
        Some(SECONDS_PER_TICK)
    }

    /// Stop ticking. No tick is delivered after this returns.
    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }
}

/// Render seconds as `MM:SS`.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Urgency band for the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    Normal,
    /// Under ten minutes left.
    Warning,
    /// Under five minutes left.
    Danger,
}

impl TimeBand {
    pub fn for_remaining(secs: u32) -> Self {
        if secs < 300 {
            TimeBand::Danger
        } else if secs < 600 {
            TimeBand::Warning
        } else {
            TimeBand::Normal
        }
    }
}

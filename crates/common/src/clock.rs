//! Clock and pacing utilities for the capture loop.
//!
//! A run is anchored to a monotonic epoch recorded when capture begins.
//! Pacing is best effort: the pacer sleeps a fixed interval after each
//! tick and never subtracts the time the tick itself took, so wall-clock
//! spacing drifts slightly longer than the nominal interval. Video timing
//! is defined by frame count at the declared rate, not by this clock.

use std::time::{Duration, Instant};

/// A run clock that provides elapsed time relative to a fixed epoch.
#[derive(Debug, Clone)]
pub struct RunClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl RunClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the epoch.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Fixed-interval pacer for capture ticks.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    report_every: u32,
}

impl FramePacer {
    pub fn new(interval: Duration, report_every: u32) -> Self {
        Self {
            interval,
            report_every: report_every.max(1),
        }
    }

    /// Sleep one full interval.
    pub async fn wait(&self) {
        tokio::time::sleep(self.interval).await;
    }

    /// Whether a progress report is due once `frames` frames are captured.
    pub fn should_report(&self, frames: u32) -> bool {
        frames > 0 && frames % self.report_every == 0
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RunClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(clock.epoch_wall().contains('T'));
    }

    #[test]
    fn test_report_cadence() {
        let pacer = FramePacer::new(Duration::from_millis(83), 60);
        assert!(!pacer.should_report(0));
        assert!(!pacer.should_report(59));
        assert!(pacer.should_report(60));
        assert!(!pacer.should_report(61));
        assert!(pacer.should_report(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_full_interval() {
        let pacer = FramePacer::new(Duration::from_millis(83), 60);
        let before = tokio::time::Instant::now();
        pacer.wait().await;
        assert_eq!(before.elapsed(), Duration::from_millis(83));
    }
}

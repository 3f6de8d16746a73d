// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-rate loop pacing

use crate::errors::{AppError, AppResult};
use std::thread;
use std::time::{Duration, Instant};

/// Caps how often the acquisition loop may iterate
///
/// Each `sleep` waits for the next deadline, one period after the previous
/// one. When an iteration overruns by more than a full period the schedule
/// restarts from now instead of bursting to catch up. Without a rate, `sleep`
/// returns immediately.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    period: Option<Duration>,
    last_deadline: Instant,
}

impl RateLimiter {
    /// Pace at `max_rate_hz`, or not at all when `None`
    pub fn new(max_rate_hz: Option<f64>) -> AppResult<Self> {
        let period = match max_rate_hz {
            None => None,
            Some(hz) if hz.is_finite() && hz > 0.0 => Some(Duration::from_secs_f64(1.0 / hz)),
            Some(hz) => {
                return Err(AppError::Config(format!(
                    "max rate must be a positive number of hertz, got {}",
                    hz
                )));
            }
        };

        Ok(Self {
            period,
            last_deadline: Instant::now(),
        })
    }

    /// Restart the schedule from now
    pub fn reset(&mut self) {
        self.last_deadline = Instant::now();
    }

    /// Wait for the next deadline, returning how long was slept
    pub fn sleep(&mut self) -> Duration {
        let Some(period) = self.period else {
            return Duration::ZERO;
        };

        let now = Instant::now();
        let deadline = self.last_deadline + period;

        if now >= deadline {
            self.last_deadline = if now > deadline + period {
                now
            } else {
                deadline
            };
            return Duration::ZERO;
        }

        let wait = deadline - now;
        thread::sleep(wait);
        self.last_deadline = deadline;
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unthrottled_never_sleeps() {
        let mut rate = RateLimiter::new(None).unwrap();
        let start = Instant::now();
        for _ in 0..100 {
            assert_eq!(rate.sleep(), Duration::ZERO);
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_paces_iterations() {
        let mut rate = RateLimiter::new(Some(50.0)).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            rate.sleep();
        }
        // 5 periods of 20 ms, minus scheduling slack
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_overrun_does_not_burst() {
        let mut rate = RateLimiter::new(Some(100.0)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(rate.sleep(), Duration::ZERO);
        // The schedule restarted, so the next call waits again
        assert!(rate.sleep() > Duration::ZERO);
    }

    #[test]
    fn test_rejects_invalid_rate() {
        assert!(RateLimiter::new(Some(0.0)).is_err());
        assert!(RateLimiter::new(Some(-1.0)).is_err());
        assert!(RateLimiter::new(Some(f64::NAN)).is_err());
    }
}

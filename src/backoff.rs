//! Poll scheduling with exponential backoff
//!
//! [`Backoff`] turns a [`PollConfig`] into the sequence of delays between
//! export status polls, and tracks the attempt and wall-clock budget so the
//! poller knows when to give up.
//!
//! # Example
//!
//! ```
//! use nessus_export::backoff::Backoff;
//! use nessus_export::config::PollConfig;
//! use std::time::Duration;
//!
//! let config = PollConfig {
//!     initial_interval: Duration::from_millis(100),
//!     max_interval: Duration::from_millis(300),
//!     backoff_multiplier: 2.0,
//!     ..Default::default()
//! };
//! let mut backoff = Backoff::new(&config);
//! assert_eq!(backoff.next_delay(), Duration::from_millis(100));
//! assert_eq!(backoff.next_delay(), Duration::from_millis(200));
//! assert_eq!(backoff.next_delay(), Duration::from_millis(300));
//! ```

use crate::config::PollConfig;
use rand::Rng;
use std::time::{Duration, Instant};

/// Delay schedule and budget for one export job
#[derive(Debug)]
pub struct Backoff {
    delay: Duration,
    max_interval: Duration,
    multiplier: f64,
    jitter: bool,
    max_attempts: u32,
    max_wait: Duration,
    attempts: u32,
    started: Instant,
}

impl Backoff {
    /// Start a new schedule; the wall-clock budget starts now
    pub fn new(config: &PollConfig) -> Self {
        Self {
            delay: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            max_attempts: config.max_attempts,
            max_wait: config.max_wait,
            attempts: 0,
            started: Instant::now(),
        }
    }

    /// Record that a poll was made
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Number of polls recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time since the schedule started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether another poll fits in the budget
    ///
    /// Both the attempt count and the wall-clock limit must have room, and the
    /// next sleep must not run past `max_wait`.
    pub fn has_budget(&self, next_delay: Duration) -> bool {
        self.attempts < self.max_attempts
            && self
                .elapsed()
                .checked_add(next_delay)
                .is_some_and(|deadline| deadline <= self.max_wait)
    }

    /// Delay to wait before the next poll, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        // Saturate at the ceiling when the product no longer fits in a Duration
        self.delay = Duration::try_from_secs_f64(self.delay.as_secs_f64() * self.multiplier)
            .map_or(self.max_interval, |next| next.min(self.max_interval));

        if self.jitter {
            add_jitter(current)
        } else {
            current
        }
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 25% of the delay, so the
/// schedule stays close to the configured interval.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=0.25);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}

//! Bounded polling for reads that race a just-completed write.
//!
//! The code host indexes pushes and PR edits asynchronously, so a read issued
//! right after a write can legitimately come back empty. The poller retries
//! such reads on a fixed backoff schedule and reports when the data never
//! showed up; callers treat that as a soft success because the write itself
//! already happened.
//!
//! ```text
//! read ─ empty ─ sleep 1s ─ read ─ empty ─ sleep 2s ─ read ─ empty ─ sleep 4s ─ read
//!   │                         │                         │                         │
//!   └── found ────────────────┴── found ────────────────┴── found ────────────────┴──> PollOutcome
//! ```

use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Source of blocking waits, injectable for tests
pub trait Clock {
    /// Block the current thread for `delay`
    fn sleep(&self, delay: Duration);
}

/// Real wall-clock waits
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Delays to wait before each retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    delays: Vec<Duration>,
}

impl PollPolicy {
    /// Default schedule: retries after 1s, 2s and 4s
    pub fn standard() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ])
    }

    /// Lower-latency schedule: retries after 0.5s and 1.0s
    pub fn fast() -> Self {
        Self::new(vec![Duration::from_millis(500), Duration::from_secs(1)])
    }

    /// Custom schedule; an empty schedule means a single read
    pub const fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Delays in retry order
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Maximum number of retries after the initial read
    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    /// Upper bound on time spent waiting
    pub fn total_max_wait(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of polling a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The read returned a value
    Found {
        /// The value
        value: T,
        /// Retries needed (0 when the first read succeeded)
        retries: usize,
    },
    /// Every read came back empty
    NotYetVisible {
        /// Total reads performed
        attempts: usize,
    },
}

impl<T> PollOutcome<T> {
    /// The value, if one was found
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found { value, .. } => Some(value),
            Self::NotYetVisible { .. } => None,
        }
    }

    /// Whether the data was never seen
    pub const fn is_not_yet_visible(&self) -> bool {
        matches!(self, Self::NotYetVisible { .. })
    }
}

/// Retries an empty read on a bounded schedule
pub struct ConsistencyPoller<'a> {
    policy: PollPolicy,
    clock: &'a dyn Clock,
}

impl<'a> ConsistencyPoller<'a> {
    /// Create a poller with the given schedule and clock
    pub const fn new(policy: PollPolicy, clock: &'a dyn Clock) -> Self {
        Self { policy, clock }
    }

    /// The schedule in use
    pub const fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `read` until it yields a value or the schedule is exhausted.
    ///
    /// `Ok(None)` and `Err(_)` both count as "not visible yet"; an error from a
    /// read that races a write says nothing about whether the write happened.
    pub fn poll<T, F>(&self, what: &str, mut read: F) -> PollOutcome<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match read() {
                Ok(Some(value)) => {
                    debug!(what, attempts, "read became visible");
                    return PollOutcome::Found {
                        value,
                        retries: attempts - 1,
                    };
                }
                Ok(None) => debug!(what, attempts, "read returned nothing yet"),
                Err(e) => debug!(what, attempts, error = %e, "read failed, treating as not visible"),
            }

            let Some(delay) = self.policy.delays.get(attempts - 1) else {
                debug!(what, attempts, "giving up; data not visible yet");
                return PollOutcome::NotYetVisible { attempts };
            };
            self.clock.sleep(*delay);
        }
    }
}

//! Single-slot debounce timer.
//!
//! Holds at most one deadline. Re-arming replaces the deadline outright;
//! there is never a queue of pending expirations.

use std::time::Duration;

use tokio::time::Instant;

/// Debounce timer owned by a refresh session.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Start or restart the timer from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Clear the timer.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Resolves when the current deadline passes. Never resolves while disarmed.
    ///
    /// The caller must [`disarm`](Self::disarm) after expiry, otherwise the
    /// future resolves again immediately.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

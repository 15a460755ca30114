use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{error, info};

/// Consecutive-failure circuit breaker for a remote dependency.
///
/// Opens once the failure count reaches the threshold and stays open until a
/// successful call resets it; local/cache activity never touches the counter.
/// The counter is atomic so concurrent requests cannot lose updates; a race
/// only affects breaker sensitivity, never an individual response.
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    consecutive_failures: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, threshold: u32) -> Self {
        Self {
            name: name.into(),
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Whether calls should bypass the protected dependency.
    pub fn is_open(&self) -> bool {
        self.consecutive_failures.load(Ordering::Relaxed) >= self.threshold
    }

    /// Record a failed call, returning the updated consecutive count.
    pub fn record_failure(&self) -> u32 {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures == self.threshold {
            error!(
                "CircuitBreaker [{}]: opening after {} consecutive failures",
                self.name, failures
            );
        }
        failures
    }

    /// Record a successful call. The only way the counter resets.
    pub fn record_success(&self) {
        let previous = self.consecutive_failures.swap(0, Ordering::Relaxed);
        if previous >= self.threshold {
            info!(
                "CircuitBreaker [{}]: closing after successful call ({} failures cleared)",
                self.name, previous
            );
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }
}

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared across concurrent requests. All increments are
/// atomic; `snapshot` gives a consistent-enough view for reporting.
#[derive(Debug, Default)]
pub struct InferenceStats {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    remote_calls: AtomicU64,
    local_calls: AtomicU64,
    ensemble_calls: AtomicU64,
    fallback_calls: AtomicU64,
    errors: AtomicU64,
}

impl InferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_call(&self) {
        self.local_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ensemble_call(&self) {
        self.ensemble_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let remote_calls = self.remote_calls.load(Ordering::Relaxed);
        let local_calls = self.local_calls.load(Ordering::Relaxed);
        let ensemble_calls = self.ensemble_calls.load(Ordering::Relaxed);
        let fallback_calls = self.fallback_calls.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);

        StatsSnapshot {
            total_requests: total,
            cache_hits,
            remote_calls,
            local_calls,
            ensemble_calls,
            fallback_calls,
            errors,
            cache_hit_rate: rate(cache_hits, total),
            remote_usage_rate: rate(remote_calls, total),
            local_usage_rate: rate(local_calls, total),
            fallback_rate: rate(fallback_calls, total),
            error_rate: rate(errors, total),
        }
    }
}

fn rate(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Read-only view of the counters, with usage rates in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub remote_calls: u64,
    pub local_calls: u64,
    pub ensemble_calls: u64,
    pub fallback_calls: u64,
    pub errors: u64,
    pub cache_hit_rate: f64,
    pub remote_usage_rate: f64,
    pub local_usage_rate: f64,
    pub fallback_rate: f64,
    pub error_rate: f64,
}

/// Component status for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentHealth {
    Healthy,
    Degraded(String),
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Degraded operation (breaker open, cache down) is observable here, never
/// through a failed inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub remote: ComponentHealth,
    pub cache: ComponentHealth,
    pub local_model: ComponentHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_are_consistent_with_counters() {
        let stats = InferenceStats::new();
        for _ in 0..4 {
            stats.record_request();
        }
        stats.record_cache_hit();
        stats.record_local_call();
        stats.record_local_call();
        stats.record_remote_call();
        stats.record_fallback();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.cache_hit_rate, 25.0);
        assert_eq!(snapshot.local_usage_rate, 50.0);
        assert_eq!(snapshot.remote_usage_rate, 25.0);
        assert_eq!(snapshot.fallback_rate, 25.0);
        assert_eq!(snapshot.error_rate, 0.0);
    }

    #[test]
    fn test_empty_stats_have_zero_rates() {
        let snapshot = InferenceStats::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.cache_hit_rate, 0.0);
    }
}

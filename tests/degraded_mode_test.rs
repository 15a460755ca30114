//! Degraded operation: remote failures, breaker behavior and recovery.
//! A failing dependency must never surface as a failed inference call.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use signalforge::application::orchestrator::{HybridOrchestrator, OrchestratorConfig};
use signalforge::application::stats::HealthStatus;
use signalforge::domain::errors::{InferenceError, RemoteApiError};
use signalforge::domain::ports::RemoteSignalService;
use signalforge::domain::privacy::SanitizedRequest;
use signalforge::domain::types::{
    FeatureVector, MarketSnapshot, PredictionResult, ProbabilityTriple, Signal,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Remote stub whose health can be flipped mid-test.
struct FlakyRemote {
    calls: AtomicU32,
    healthy: AtomicBool,
}

impl FlakyRemote {
    fn new(healthy: bool) -> Self {
        Self {
            calls: AtomicU32::new(0),
            healthy: AtomicBool::new(healthy),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

#[async_trait]
impl RemoteSignalService for FlakyRemote {
    async fn analyze(
        &self,
        _request: &SanitizedRequest,
    ) -> Result<PredictionResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.healthy.load(Ordering::Relaxed) {
            return Err(RemoteApiError::RetriesExhausted {
                attempts: 3,
                last: "request failed: 503 Service Unavailable".to_string(),
            }
            .into());
        }
        Ok(PredictionResult {
            signal: Signal::Buy,
            confidence: 0.66,
            probabilities: ProbabilityTriple::from_confidence(Signal::Buy, 0.66),
            position_size: 0.2,
            stop_loss: Some(dec!(48500)),
            take_profit: Some(dec!(52000)),
            reasoning: "accumulation".to_string(),
            source: "deepseek".to_string(),
        })
    }
}

fn snapshot() -> MarketSnapshot {
    MarketSnapshot {
        symbol: "ETHUSDT".to_string(),
        price: dec!(3200),
        high_24h: dec!(3300),
        low_24h: dec!(3100),
        volume_24h: dec!(850000),
        bid_ask_spread: dec!(0.2),
        funding_rate: -0.0002,
    }
}

fn complex_features() -> FeatureVector {
    FeatureVector::from([("rsi", 50.0), ("volatility", 1.5)])
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_stops_remote_attempts() {
    let remote = Arc::new(FlakyRemote::new(false));
    let orchestrator = HybridOrchestrator::new(remote.clone(), OrchestratorConfig::default());

    // Three consecutive remote failures open the breaker.
    for _ in 0..3 {
        let response = orchestrator
            .get_trading_signal(&snapshot(), &complex_features(), None, None, None)
            .await
            .unwrap();
        // Every failure is served by the local model.
        assert_eq!(response.prediction.source, "local_rules");
    }
    assert_eq!(remote.calls(), 3);
    assert_eq!(orchestrator.consecutive_remote_failures(), 3);

    // Breaker open: the remote client is not attempted again.
    let response = orchestrator
        .get_trading_signal(&snapshot(), &complex_features(), None, None, None)
        .await
        .unwrap();
    assert_eq!(remote.calls(), 3);
    assert_eq!(response.prediction.source, "local_rules");

    let stats = orchestrator.stats();
    assert_eq!(stats.total_requests, 4);
    assert_eq!(stats.fallback_calls, 4);
    assert_eq!(stats.local_calls, 4);
    assert_eq!(stats.remote_calls, 0);
    assert_eq!(stats.errors, 3);
}

#[tokio::test]
async fn single_remote_success_resets_the_breaker() {
    let remote = Arc::new(FlakyRemote::new(false));
    let config = OrchestratorConfig {
        max_failures_before_fallback: 5,
        ..OrchestratorConfig::default()
    };
    let orchestrator = HybridOrchestrator::new(remote.clone(), config);

    for _ in 0..4 {
        orchestrator
            .get_trading_signal(&snapshot(), &complex_features(), None, None, None)
            .await
            .unwrap();
    }
    assert_eq!(orchestrator.consecutive_remote_failures(), 4);

    // The dependency recovers; the next remote call resets the counter to 0.
    remote.set_healthy(true);
    let response = orchestrator
        .get_trading_signal(&snapshot(), &complex_features(), None, None, None)
        .await
        .unwrap();

    assert_eq!(response.prediction.source, "deepseek");
    assert_eq!(orchestrator.consecutive_remote_failures(), 0);
    assert_eq!(orchestrator.stats().remote_calls, 1);
}

#[tokio::test]
async fn degradation_is_visible_only_through_health_and_stats() {
    let remote = Arc::new(FlakyRemote::new(false));
    let orchestrator = HybridOrchestrator::new(remote, OrchestratorConfig::default());

    assert_eq!(orchestrator.health().await.status, HealthStatus::Healthy);

    for _ in 0..5 {
        // Every call still yields a complete, well-formed result.
        let response = orchestrator
            .get_trading_signal(&snapshot(), &complex_features(), None, None, None)
            .await
            .unwrap();
        assert!((0.0..=1.0).contains(&response.prediction.confidence));
        assert!((response.prediction.probabilities.sum() - 1.0).abs() < 1e-6);
    }

    let health = orchestrator.health().await;
    assert_eq!(health.status, HealthStatus::Degraded);
}

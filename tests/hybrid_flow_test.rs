//! End-to-end flows through the hybrid orchestrator: routing, caching and
//! the privacy gate.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use signalforge::application::orchestrator::{HybridOrchestrator, OrchestratorConfig};
use signalforge::domain::errors::InferenceError;
use signalforge::domain::ports::RemoteSignalService;
use signalforge::domain::privacy::SanitizedRequest;
use signalforge::domain::types::{
    FeatureVector, MarketSnapshot, MetricMap, PredictionResult, ProbabilityTriple, Signal,
};
use signalforge::infrastructure::cache::InMemoryCache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct CountingRemote {
    calls: AtomicU32,
}

impl CountingRemote {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RemoteSignalService for CountingRemote {
    async fn analyze(
        &self,
        _request: &SanitizedRequest,
    ) -> Result<PredictionResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(PredictionResult {
            signal: Signal::Sell,
            confidence: 0.71,
            probabilities: ProbabilityTriple::from_confidence(Signal::Sell, 0.71),
            position_size: 0.2,
            stop_loss: Some(dec!(51500)),
            take_profit: Some(dec!(47000)),
            reasoning: "distribution pattern near resistance".to_string(),
            source: "deepseek".to_string(),
        })
    }
}

fn snapshot() -> MarketSnapshot {
    MarketSnapshot {
        symbol: "BTCUSDT".to_string(),
        price: dec!(50000),
        high_24h: dec!(51000),
        low_24h: dec!(49000),
        volume_24h: dec!(1200000),
        bid_ask_spread: dec!(0.5),
        funding_rate: 0.0001,
    }
}

#[tokio::test]
async fn simple_scenario_is_served_locally_without_remote_side_effects() {
    let remote = Arc::new(CountingRemote::new());
    let orchestrator = HybridOrchestrator::new(remote.clone(), OrchestratorConfig::default());

    // RSI 82, volume surge, calm volatility: rule 1 routes to the local path.
    let features = FeatureVector::from([
        ("rsi", 82.0),
        ("volume_ratio", 2.5),
        ("volatility", 0.8),
    ]);
    let response = orchestrator
        .get_trading_signal(&snapshot(), &features, None, None, None)
        .await
        .unwrap();

    assert_eq!(remote.calls(), 0);
    assert_eq!(response.prediction.source, "local_rules");
    assert_eq!(response.prediction.signal, Signal::Sell);
    assert!(!response.metadata.cached);

    let stats = orchestrator.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.local_calls, 1);
    assert_eq!(stats.remote_calls, 0);
    assert_eq!(stats.fallback_calls, 0);
    assert_eq!(orchestrator.consecutive_remote_failures(), 0);
}

#[tokio::test]
async fn identical_request_within_ttl_is_served_from_cache() {
    let remote = Arc::new(CountingRemote::new());
    let orchestrator = HybridOrchestrator::new(remote.clone(), OrchestratorConfig::default())
        .with_cache(Arc::new(InMemoryCache::new()));

    let features = FeatureVector::from([("rsi", 50.0), ("volatility", 1.5)]);

    let first = orchestrator
        .get_trading_signal(&snapshot(), &features, None, None, None)
        .await
        .unwrap();
    assert!(!first.metadata.cached);
    assert_eq!(remote.calls(), 1);

    let second = orchestrator
        .get_trading_signal(&snapshot(), &features, None, None, None)
        .await
        .unwrap();

    // Second call: no classification, no predictor, just the cache.
    assert!(second.metadata.cached);
    assert!(second.metadata.complexity.is_none());
    assert_eq!(remote.calls(), 1);
    assert_eq!(second.prediction.signal, first.prediction.signal);
    assert_eq!(second.prediction.reasoning, first.prediction.reasoning);

    let stats = orchestrator.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.remote_calls, 1);
    assert_eq!(stats.local_calls, 0);
}

#[tokio::test]
async fn rounded_equal_inputs_share_one_cache_entry() {
    let remote = Arc::new(CountingRemote::new());
    let orchestrator = HybridOrchestrator::new(remote.clone(), OrchestratorConfig::default())
        .with_cache(Arc::new(InMemoryCache::new()));

    let features = FeatureVector::from([("rsi", 50.001), ("volatility", 1.5)]);
    orchestrator
        .get_trading_signal(&snapshot(), &features, None, None, None)
        .await
        .unwrap();

    // Same inputs inside the rounding granularity map to the same key.
    let mut close = snapshot();
    close.price = dec!(50000.004);
    let nearby = FeatureVector::from([("rsi", 50.002), ("volatility", 1.5)]);
    let response = orchestrator
        .get_trading_signal(&close, &nearby, None, None, None)
        .await
        .unwrap();

    assert!(response.metadata.cached);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn sensitive_on_chain_payload_never_reaches_remote() {
    let remote = Arc::new(CountingRemote::new());
    let orchestrator = HybridOrchestrator::new(remote.clone(), OrchestratorConfig::default());

    let features = FeatureVector::from([("rsi", 50.0), ("volatility", 1.5)]);
    let mut on_chain = MetricMap::new();
    on_chain.insert(
        "wallet_address".to_string(),
        serde_json::json!("0x9f8e7d6c"),
    );

    let response = orchestrator
        .get_trading_signal(&snapshot(), &features, None, Some(&on_chain), None)
        .await
        .unwrap();

    assert_eq!(remote.calls(), 0);
    assert_eq!(response.prediction.source, "local_rules");

    let stats = orchestrator.stats();
    assert_eq!(stats.fallback_calls, 1);
    assert_eq!(stats.local_calls, 1);
    assert_eq!(stats.remote_calls, 0);
    // Privacy aborts never count against the remote breaker.
    assert_eq!(orchestrator.consecutive_remote_failures(), 0);
}

#[tokio::test]
async fn concurrent_requests_all_resolve() {
    let remote = Arc::new(CountingRemote::new());
    let orchestrator = Arc::new(
        HybridOrchestrator::new(remote, OrchestratorConfig::default())
            .with_cache(Arc::new(InMemoryCache::new())),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            // Distinct prices: distinct cache keys, concurrent misses.
            let mut snapshot = snapshot();
            snapshot.price = dec!(50000) + rust_decimal::Decimal::from(i * 10);
            let features = FeatureVector::from([("rsi", 50.0), ("volatility", 1.5)]);
            orchestrator
                .get_trading_signal(&snapshot, &features, None, None, None)
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.prediction.source, "deepseek");
    }
    assert_eq!(orchestrator.stats().total_requests, 8);
}

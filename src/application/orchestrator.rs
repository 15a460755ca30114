use crate::application::stats::{
    ComponentHealth, HealthReport, HealthStatus, InferenceStats, StatsSnapshot,
};
use crate::domain::classifier::{Complexity, ScenarioClassifier};
use crate::domain::ensemble::EnsemblePredictor;
use crate::domain::errors::{SensitiveDataError, ValidationError};
use crate::domain::local_model::{LocalRuleModel, position_ladder};
use crate::domain::ports::{RemoteSignalService, SignalCache};
use crate::domain::privacy::{DataAnonymizer, SensitiveDataValidator};
use crate::domain::types::{
    FeatureVector, MarketSnapshot, MetricMap, PredictionResult, ProbabilityTriple,
    ResponseMetadata, SignalResponse,
};
use crate::infrastructure::cache::cache_key;
use crate::infrastructure::core::CircuitBreaker;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Explicit backend selection supplied by the caller; short-circuits scenario
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOverride {
    Local,
    Remote,
    Ensemble,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_ttl: Duration,
    pub max_failures_before_fallback: u32,
    pub enable_anonymization: bool,
    pub generalize_symbol: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            max_failures_before_fallback: 3,
            enable_anonymization: true,
            generalize_symbol: false,
        }
    }
}

/// The hybrid inference core. Per request: cache check, scenario
/// classification, backend routing with privacy gating and circuit-breaker
/// protected remote calls, unconditional local fallback, best-effort cache
/// write. Every path terminates in a valid response; degradation is visible
/// only through `stats`/`health`.
pub struct HybridOrchestrator {
    remote: Arc<dyn RemoteSignalService>,
    local: LocalRuleModel,
    ensemble: Option<EnsemblePredictor>,
    cache: Option<Arc<dyn SignalCache>>,
    anonymizer: DataAnonymizer,
    breaker: CircuitBreaker,
    stats: InferenceStats,
    config: OrchestratorConfig,
}

impl HybridOrchestrator {
    pub fn new(remote: Arc<dyn RemoteSignalService>, config: OrchestratorConfig) -> Self {
        Self {
            remote,
            local: LocalRuleModel::new(),
            ensemble: None,
            cache: None,
            anonymizer: DataAnonymizer::new(config.generalize_symbol),
            breaker: CircuitBreaker::new("remote_signal", config.max_failures_before_fallback),
            stats: InferenceStats::new(),
            config,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SignalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_ensemble(mut self, ensemble: EnsemblePredictor) -> Self {
        self.ensemble = Some(ensemble);
        self
    }

    /// Main entry point. The only error that can reach the caller is a
    /// malformed request detected before any backend is invoked; every other
    /// failure mode degrades into a local result.
    pub async fn get_trading_signal(
        &self,
        snapshot: &MarketSnapshot,
        features: &FeatureVector,
        sentiment: Option<&MetricMap>,
        on_chain: Option<&MetricMap>,
        force: Option<BackendOverride>,
    ) -> Result<SignalResponse, ValidationError> {
        Self::validate_request(snapshot)?;

        self.stats.record_request();
        let started = Instant::now();
        let key = cache_key(snapshot, features);

        if let Some(prediction) = self.read_cache(&key).await {
            self.stats.record_cache_hit();
            debug!("cache hit for {}", snapshot.symbol);
            return Ok(Self::respond(prediction, None, None, started, true));
        }

        let (complexity, reason) = match force {
            Some(backend) => {
                let complexity = match backend {
                    BackendOverride::Local => Complexity::Simple,
                    BackendOverride::Remote | BackendOverride::Ensemble => Complexity::Complex,
                };
                (complexity, format!("explicit backend override: {backend:?}"))
            }
            None => ScenarioClassifier::classify(snapshot, features),
        };
        info!("scenario classified as {complexity}: {reason}");

        let prediction = match (force, complexity) {
            (Some(BackendOverride::Ensemble), _) => self.call_ensemble(features),
            (Some(BackendOverride::Local), _) | (None, Complexity::Simple) => {
                self.call_local(snapshot, features)
            }
            (Some(BackendOverride::Remote), _) | (None, Complexity::Complex) => {
                self.call_remote_with_fallback(snapshot, features, sentiment, on_chain)
                    .await
            }
        };

        self.write_cache(&key, &prediction).await;

        Ok(Self::respond(
            prediction,
            Some(complexity),
            Some(reason),
            started,
            false,
        ))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn consecutive_remote_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    pub async fn health(&self) -> HealthReport {
        let remote = if self.breaker.is_open() {
            ComponentHealth::Degraded(format!(
                "circuit breaker open after {} consecutive failures",
                self.breaker.consecutive_failures()
            ))
        } else {
            ComponentHealth::Healthy
        };

        let cache = match &self.cache {
            None => ComponentHealth::Disabled,
            Some(cache) => match cache.ping().await {
                Ok(()) => ComponentHealth::Healthy,
                Err(e) => ComponentHealth::Degraded(e.to_string()),
            },
        };

        let degraded = matches!(remote, ComponentHealth::Degraded(_))
            || matches!(cache, ComponentHealth::Degraded(_));

        HealthReport {
            status: if degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            remote,
            cache,
            local_model: ComponentHealth::Healthy,
        }
    }

    fn validate_request(snapshot: &MarketSnapshot) -> Result<(), ValidationError> {
        if snapshot.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if snapshot.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice {
                value: snapshot.price,
            });
        }
        Ok(())
    }

    fn call_local(&self, snapshot: &MarketSnapshot, features: &FeatureVector) -> PredictionResult {
        debug!("running local rule model");
        self.stats.record_local_call();
        self.local.predict(snapshot, features)
    }

    fn call_ensemble(&self, features: &FeatureVector) -> PredictionResult {
        self.stats.record_ensemble_call();
        let Some(ensemble) = &self.ensemble else {
            warn!("ensemble backend requested but no members configured");
            return PredictionResult {
                signal: crate::domain::types::Signal::Hold,
                confidence: 0.5,
                probabilities: ProbabilityTriple::UNIFORM,
                position_size: 0.0,
                stop_loss: None,
                take_profit: None,
                reasoning: "ensemble backend not configured".to_string(),
                source: "ensemble".to_string(),
            };
        };

        let outcome = ensemble.predict(features, None);
        let confidence = outcome.confidence / 100.0;
        let reasoning = match &outcome.error {
            Some(error) => format!("ensemble fallback: {error}"),
            None => format!(
                "weighted ensemble of [{}], consensus {:.0}%{}",
                outcome.sources.join(", "),
                outcome.consensus.consensus_rate * 100.0,
                if outcome.consensus.is_unanimous {
                    " (unanimous)"
                } else {
                    ""
                }
            ),
        };

        PredictionResult {
            signal: outcome.signal,
            confidence,
            probabilities: outcome.probabilities,
            position_size: position_ladder(confidence),
            stop_loss: None,
            take_profit: None,
            reasoning,
            source: "ensemble".to_string(),
        }
    }

    /// Remote branch: breaker gate, privacy gate, then the call itself. Any
    /// failure degrades to the local model; only a genuine remote call
    /// outcome touches the breaker.
    async fn call_remote_with_fallback(
        &self,
        snapshot: &MarketSnapshot,
        features: &FeatureVector,
        sentiment: Option<&MetricMap>,
        on_chain: Option<&MetricMap>,
    ) -> PredictionResult {
        if self.breaker.is_open() {
            warn!(
                "remote bypassed: circuit breaker open ({} consecutive failures)",
                self.breaker.consecutive_failures()
            );
            self.stats.record_fallback();
            return self.call_local(snapshot, features);
        }

        let request = if self.config.enable_anonymization {
            // The blacklist scan runs on the raw combined payload, before the
            // whitelist can silently strip an offending key: caller-supplied
            // sensitive data always aborts the remote path. Fail closed,
            // never auto-redact and send.
            let raw_payload = serde_json::json!({
                "market": snapshot,
                "features": features,
                "sentiment": sentiment,
                "on_chain": on_chain,
            });
            let outcome = SensitiveDataValidator::validate(&raw_payload);
            if !outcome.is_safe {
                let err = SensitiveDataError {
                    fields: outcome.offending_paths,
                };
                error!("refusing remote call: {err}");
                self.stats.record_fallback();
                return self.call_local(snapshot, features);
            }
            self.anonymizer
                .anonymize(snapshot, features, sentiment, on_chain)
        } else {
            DataAnonymizer::passthrough(snapshot, features, sentiment, on_chain)
        };

        match self.remote.analyze(&request).await {
            Ok(mut result) => {
                self.breaker.record_success();
                self.stats.record_remote_call();
                result.clamp_ranges();
                result
            }
            Err(e) => {
                error!("remote analysis failed, falling back to local model: {e}");
                self.breaker.record_failure();
                self.stats.record_error();
                self.stats.record_fallback();
                self.call_local(snapshot, features)
            }
        }
    }

    async fn read_cache(&self, key: &str) -> Option<PredictionResult> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<PredictionResult>(&raw) {
                Ok(mut prediction) => {
                    prediction.clamp_ranges();
                    Some(prediction)
                }
                Err(e) => {
                    // Malformed entry degrades to a miss.
                    warn!("malformed cache entry for {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("cache read failed, treating as miss: {e}");
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, prediction: &PredictionResult) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match serde_json::to_string(prediction) {
            Ok(payload) => {
                if let Err(e) = cache.set(key, &payload, self.config.cache_ttl).await {
                    warn!("cache write failed: {e}");
                }
            }
            Err(e) => warn!("failed to serialize prediction for cache: {e}"),
        }
    }

    fn respond(
        prediction: PredictionResult,
        complexity: Option<Complexity>,
        reason: Option<String>,
        started: Instant,
        cached: bool,
    ) -> SignalResponse {
        SignalResponse {
            prediction,
            metadata: ResponseMetadata {
                request_id: Uuid::new_v4(),
                complexity,
                classification_reason: reason,
                response_time_ms: started.elapsed().as_millis() as u64,
                cached,
                timestamp: Utc::now(),
            },
        }
    }
}

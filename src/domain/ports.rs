use crate::domain::ensemble::MemberPrediction;
use crate::domain::errors::{CacheError, InferenceError};
use crate::domain::privacy::SanitizedRequest;
use crate::domain::types::{FeatureVector, PredictionResult};
use async_trait::async_trait;
use std::time::Duration;

/// Remote reasoning backend. Receives only sanitized payloads; the privacy
/// gate runs before anything crosses this boundary.
#[async_trait]
pub trait RemoteSignalService: Send + Sync {
    async fn analyze(&self, request: &SanitizedRequest) -> Result<PredictionResult, InferenceError>;
}

/// Shared result cache, accessed read-through/write-through with no
/// cross-request locking. Values are serialized `PredictionResult` JSON.
#[async_trait]
pub trait SignalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Liveness probe for health reporting.
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Capability contract every statistical ensemble member must expose.
/// Side-effect-free from the orchestrator's point of view; sequence-aware
/// members may consume the optional feature history.
pub trait SignalPredictor: Send + Sync {
    fn predict(
        &self,
        features: &FeatureVector,
        history: Option<&[FeatureVector]>,
    ) -> Result<MemberPrediction, String>;

    fn name(&self) -> &str;
}

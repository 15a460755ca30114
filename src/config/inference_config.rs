use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key}={raw}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Orchestration settings: cache, breaker, privacy gate and ensemble weights.
#[derive(Debug, Clone)]
pub struct InferenceEnvConfig {
    pub cache_ttl_secs: u64,
    pub max_failures_before_fallback: u32,
    pub enable_anonymization: bool,
    pub generalize_symbol: bool,
    /// Per-source ensemble weights, normalized over present sources at
    /// combination time.
    pub ensemble_weights: HashMap<String, f64>,
}

impl InferenceEnvConfig {
    pub fn from_env() -> Result<Self> {
        let ensemble_weights = match env::var("ENSEMBLE_WEIGHTS") {
            Ok(raw) => Self::parse_weights(&raw)?,
            Err(_) => crate::domain::ensemble::DEFAULT_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        };

        Ok(Self {
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 60u64)?,
            max_failures_before_fallback: parse_env("MAX_FAILURES_BEFORE_FALLBACK", 3u32)?,
            enable_anonymization: parse_env("ENABLE_ANONYMIZATION", true)?,
            generalize_symbol: parse_env("GENERALIZE_SYMBOL", false)?,
            ensemble_weights,
        })
    }

    /// Parse `name:weight` pairs, e.g. `lstm:0.3,transformer:0.3,random_forest:0.4`.
    fn parse_weights(raw: &str) -> Result<HashMap<String, f64>> {
        let mut weights = HashMap::new();
        for entry in raw.split(',').filter(|s| !s.trim().is_empty()) {
            let (name, weight) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("Invalid ENSEMBLE_WEIGHTS entry: {entry}"))?;
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid weight in ENSEMBLE_WEIGHTS entry {entry}: {e}"))?;
            if weight < 0.0 {
                return Err(anyhow!("Negative weight in ENSEMBLE_WEIGHTS entry: {entry}"));
            }
            weights.insert(name.trim().to_string(), weight);
        }
        if weights.is_empty() {
            return Err(anyhow!("ENSEMBLE_WEIGHTS must contain at least one entry"));
        }
        Ok(weights)
    }
}

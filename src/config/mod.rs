//! Configuration module for signalforge.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: remote API, inference orchestration, and risk sizing.

mod inference_config;
mod remote_config;
mod risk_env_config;

pub use inference_config::InferenceEnvConfig;
pub use remote_config::RemoteEnvConfig;
pub use risk_env_config::RiskEnvConfig;

use crate::application::orchestrator::OrchestratorConfig;
use crate::domain::risk::RiskConfig;
use anyhow::{Context, Result, anyhow};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

/// Main application configuration, aggregating all sub-configs.
#[derive(Debug, Clone)]
pub struct Config {
    pub remote: RemoteEnvConfig,
    pub inference: InferenceEnvConfig,
    pub risk: RiskEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            remote: RemoteEnvConfig::from_env().context("Failed to load remote config")?,
            inference: InferenceEnvConfig::from_env().context("Failed to load inference config")?,
            risk: RiskEnvConfig::from_env().context("Failed to load risk config")?,
        })
    }

    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: Duration::from_secs(self.inference.cache_ttl_secs),
            max_failures_before_fallback: self.inference.max_failures_before_fallback,
            enable_anonymization: self.inference.enable_anonymization,
            generalize_symbol: self.inference.generalize_symbol,
        }
    }

    /// Create the RiskConfig domain value object from this Config.
    pub fn to_risk_config(&self) -> Result<RiskConfig> {
        RiskConfig::new(
            Decimal::from_f64(self.risk.base_position_size).unwrap_or(Decimal::ZERO),
            Decimal::from_f64(self.risk.min_position_size).unwrap_or(Decimal::ZERO),
            Decimal::from_f64(self.risk.max_position_size).unwrap_or(Decimal::ZERO),
            self.risk.stop_loss_pct / 100.0,
            self.risk.take_profit_pct / 100.0,
        )
        .map_err(|e| anyhow!("Invalid risk config: {e}"))
    }
}

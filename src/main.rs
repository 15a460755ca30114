//! Signalforge - headless hybrid inference runner
//!
//! Runs a single inference request through the hybrid orchestrator (cache,
//! scenario classification, privacy-gated remote analysis, local fallback)
//! and prints the risk-adjusted decision as JSON.
//!
//! # Usage
//! ```sh
//! DEEPSEEK_API_KEY=sk-... cargo run -- --input request.json
//! ```
//!
//! # Environment Variables
//! - `DEEPSEEK_API_KEY` - Remote API key (empty: remote calls fail and the
//!   local model serves every request)
//! - `CACHE_TTL_SECS` - Result cache TTL (default: 60)
//! - `MAX_FAILURES_BEFORE_FALLBACK` - Breaker threshold (default: 3)

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal_macros::dec;
use serde::Deserialize;
use signalforge::application::orchestrator::{BackendOverride, HybridOrchestrator};
use signalforge::application::service::InferenceService;
use signalforge::config::Config;
use signalforge::domain::ensemble::EnsemblePredictor;
use signalforge::domain::risk::RiskManager;
use signalforge::domain::types::{FeatureVector, MarketSnapshot, MetricMap};
use signalforge::infrastructure::cache::InMemoryCache;
use signalforge::infrastructure::remote::DeepSeekClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "signalforge", about = "Hybrid trading-signal inference service")]
struct Args {
    /// Path to a JSON inference request (market snapshot + features).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Force a specific backend: local, remote or ensemble.
    #[arg(long)]
    backend: Option<String>,

    /// Print service statistics and health after the inference.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(Debug, Deserialize)]
struct InferenceRequest {
    market: MarketSnapshot,
    features: FeatureVector,
    #[serde(default)]
    sentiment: Option<MetricMap>,
    #[serde(default)]
    on_chain: Option<MetricMap>,
}

fn parse_backend(raw: &str) -> Result<BackendOverride> {
    match raw.to_lowercase().as_str() {
        "local" => Ok(BackendOverride::Local),
        "remote" => Ok(BackendOverride::Remote),
        "ensemble" => Ok(BackendOverride::Ensemble),
        other => anyhow::bail!("Invalid backend: {other}. Must be 'local', 'remote' or 'ensemble'"),
    }
}

fn sample_request() -> InferenceRequest {
    InferenceRequest {
        market: MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            price: dec!(50000),
            high_24h: dec!(51250),
            low_24h: dec!(48900),
            volume_24h: dec!(1250000),
            bid_ask_spread: dec!(0.5),
            funding_rate: 0.0001,
        },
        features: FeatureVector::from([
            ("rsi", 64.0),
            ("macd", 12.5),
            ("macd_signal", 8.2),
            ("bb_position", 0.74),
            ("volume_ratio", 1.6),
            ("volatility", 0.9),
        ]),
        sentiment: None,
        on_chain: None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    info!("signalforge {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.remote.api_key.is_empty() {
        warn!("DEEPSEEK_API_KEY not set: remote analysis will fail over to the local model");
    }

    let remote = Arc::new(DeepSeekClient::new(&config.remote));
    let cache = Arc::new(InMemoryCache::new());
    // Statistical members register through the SignalPredictor port; the
    // ensemble starts empty and answers HOLD until members are attached.
    let ensemble = EnsemblePredictor::with_weights(config.inference.ensemble_weights.clone());
    let orchestrator = Arc::new(
        HybridOrchestrator::new(remote, config.to_orchestrator_config())
            .with_cache(cache)
            .with_ensemble(ensemble),
    );
    let service = InferenceService::new(orchestrator, RiskManager::new(config.to_risk_config()?));

    let request = match &args.input {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse request file {}", path.display()))?
        }
        None => {
            info!("no --input given, using built-in sample request");
            sample_request()
        }
    };

    let backend = args.backend.as_deref().map(parse_backend).transpose()?;

    let decision = service
        .infer(
            &request.market,
            &request.features,
            request.sentiment.as_ref(),
            request.on_chain.as_ref(),
            backend,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);

    if args.stats {
        let stats = service.orchestrator().stats();
        let health = service.orchestrator().health().await;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        println!("{}", serde_json::to_string_pretty(&health)?);
    }

    Ok(())
}

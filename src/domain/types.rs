use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Trading signal emitted by a predictor or returned to the caller.
///
/// `Close` exists only at the caller boundary (position management); no
/// predictor backend ever produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    Close,
}

impl Signal {
    /// True for signals that open or extend a position in a direction.
    pub fn is_directional(&self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Close => write!(f, "CLOSE"),
        }
    }
}

/// Market snapshot for a single symbol, immutable per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    pub volume_24h: Decimal,
    pub bid_ask_spread: Decimal,
    #[serde(default)]
    pub funding_rate: f64,
}

/// Named technical-indicator values, produced externally and consumed
/// read-only by every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(HashMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Lookup with a neutral default for absent indicators.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for FeatureVector {
    fn from(entries: [(&str, f64); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

/// Loosely-typed auxiliary metrics (sentiment, on-chain) attached to a request.
pub type MetricMap = HashMap<String, serde_json::Value>;

/// Class probabilities over the three predictor signals. Sums to 1 within
/// floating tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTriple {
    pub buy: f64,
    pub hold: f64,
    pub sell: f64,
}

impl ProbabilityTriple {
    /// Uniform fallback distribution used when no weighted source is present.
    pub const UNIFORM: Self = Self {
        buy: 0.33,
        hold: 0.34,
        sell: 0.33,
    };

    pub fn new(buy: f64, hold: f64, sell: f64) -> Self {
        Self { buy, hold, sell }
    }

    /// Derive a triple for a backend that reports only a chosen class and its
    /// confidence: the chosen class receives `confidence`, the remaining mass
    /// is split equally between the other two.
    pub fn from_confidence(signal: Signal, confidence: f64) -> Self {
        let c = confidence.clamp(0.0, 1.0);
        let rest = (1.0 - c) / 2.0;
        match signal {
            Signal::Buy => Self::new(c, rest, rest),
            Signal::Sell => Self::new(rest, rest, c),
            // Close never originates from a predictor; treat it as Hold.
            Signal::Hold | Signal::Close => Self::new(rest, c, rest),
        }
    }

    pub fn sum(&self) -> f64 {
        self.buy + self.hold + self.sell
    }

    /// Argmax class with first-max tie-break in (BUY, HOLD, SELL) order.
    pub fn argmax(&self) -> (Signal, f64) {
        let mut winner = (Signal::Buy, self.buy);
        if self.hold > winner.1 {
            winner = (Signal::Hold, self.hold);
        }
        if self.sell > winner.1 {
            winner = (Signal::Sell, self.sell);
        }
        winner
    }

    pub fn clamped(self) -> Self {
        Self {
            buy: self.buy.clamp(0.0, 1.0),
            hold: self.hold.clamp(0.0, 1.0),
            sell: self.sell.clamp(0.0, 1.0),
        }
    }
}

/// Result produced by any prediction backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub signal: Signal,
    /// Self-reported probability mass on the chosen signal, in [0, 1].
    pub confidence: f64,
    pub probabilities: ProbabilityTriple,
    /// Suggested fraction of account to deploy, in [0, 1].
    pub position_size: f64,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reasoning: String,
    /// Which backend produced this result (e.g. "local_rules", "deepseek").
    pub source: String,
}

impl PredictionResult {
    /// Clamp numeric fields into their contractual ranges and enforce the
    /// no-stop-levels invariant for non-directional signals. Applied whenever
    /// a result is ingested from outside the process (remote API, cache).
    pub fn clamp_ranges(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.position_size = self.position_size.clamp(0.0, 1.0);
        self.probabilities = self.probabilities.clamped();
        if !self.signal.is_directional() {
            self.stop_loss = None;
            self.take_profit = None;
        }
    }
}

/// Agreement measure across the top-choice signals of ensemble members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConsensus {
    pub buy_count: usize,
    pub hold_count: usize,
    pub sell_count: usize,
    pub total_models: usize,
    /// max vote count / total, in [0, 1]. Zero when no model contributed.
    pub consensus_rate: f64,
    pub is_unanimous: bool,
    pub is_majority: bool,
}

/// Request-level metadata attached to every orchestrator response.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub request_id: Uuid,
    /// None on cache hits: classification is skipped entirely.
    pub complexity: Option<crate::domain::classifier::Complexity>,
    pub classification_reason: Option<String>,
    pub response_time_ms: u64,
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
}

/// The orchestrator's terminal state: a prediction plus routing metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SignalResponse {
    pub prediction: PredictionResult,
    pub metadata: ResponseMetadata,
}

use crate::domain::ports::SignalPredictor;
use crate::domain::types::{EnsembleConsensus, FeatureVector, ProbabilityTriple, Signal};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Default per-source weights, renormalized over the members actually
/// configured.
pub const DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("lstm", 0.3),
    ("transformer", 0.3),
    ("random_forest", 0.4),
];

/// Single statistical member's output, tagged with its source name.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPrediction {
    pub source: String,
    pub signal: Signal,
    pub confidence: f64,
    pub probabilities: ProbabilityTriple,
}

/// Combined ensemble decision.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutcome {
    pub signal: Signal,
    /// Winning weighted probability as a percentage (0-100).
    pub confidence: f64,
    pub probabilities: ProbabilityTriple,
    pub consensus: EnsembleConsensus,
    pub sources: Vec<String>,
    pub method: &'static str,
    pub error: Option<String>,
}

/// Combines member probability triples by weighted averaging and reports an
/// inter-model consensus metric. Stateless besides the fixed weights.
pub struct EnsemblePredictor {
    members: Vec<Arc<dyn SignalPredictor>>,
    weights: HashMap<String, f64>,
}

impl EnsemblePredictor {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        }
    }

    pub fn with_weights(weights: HashMap<String, f64>) -> Self {
        Self {
            members: Vec::new(),
            weights,
        }
    }

    pub fn register(&mut self, member: Arc<dyn SignalPredictor>) {
        self.members.push(member);
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Run every member and combine whatever succeeded. A failing member is
    /// logged and dropped; its weight is not redistributed implicitly, the
    /// remaining weights are renormalized in `combine`.
    pub fn predict(
        &self,
        features: &FeatureVector,
        history: Option<&[FeatureVector]>,
    ) -> EnsembleOutcome {
        let mut results = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match member.predict(features, history) {
                Ok(prediction) => results.push(prediction),
                Err(reason) => {
                    warn!("ensemble member {} failed: {}", member.name(), reason);
                }
            }
        }
        self.combine(&results)
    }

    /// Pure combination step: weighted average of probability triples over
    /// the sources present, argmax with first-max tie-break in
    /// (BUY, HOLD, SELL) order. Never fails: with no contributing source the
    /// outcome is HOLD at 50 with an explicit failure marker.
    pub fn combine(&self, results: &[MemberPrediction]) -> EnsembleOutcome {
        if results.is_empty() {
            return EnsembleOutcome {
                signal: Signal::Hold,
                confidence: 50.0,
                probabilities: ProbabilityTriple::UNIFORM,
                consensus: Self::consensus(results),
                sources: Vec::new(),
                method: "fallback",
                error: Some("all predictors failed".to_string()),
            };
        }

        let mut weighted = ProbabilityTriple::new(0.0, 0.0, 0.0);
        let mut total_weight = 0.0;
        for result in results {
            let weight = self.weights.get(&result.source).copied().unwrap_or(0.0);
            weighted.buy += result.probabilities.buy * weight;
            weighted.hold += result.probabilities.hold * weight;
            weighted.sell += result.probabilities.sell * weight;
            total_weight += weight;
        }

        let probabilities = if total_weight > 0.0 {
            ProbabilityTriple::new(
                weighted.buy / total_weight,
                weighted.hold / total_weight,
                weighted.sell / total_weight,
            )
        } else {
            ProbabilityTriple::UNIFORM
        };

        let (signal, winning) = probabilities.argmax();

        EnsembleOutcome {
            signal,
            confidence: winning * 100.0,
            probabilities,
            consensus: Self::consensus(results),
            sources: results.iter().map(|r| r.source.clone()).collect(),
            method: "weighted_average",
            error: None,
        }
    }

    fn consensus(results: &[MemberPrediction]) -> EnsembleConsensus {
        let buy_count = results.iter().filter(|r| r.signal == Signal::Buy).count();
        let hold_count = results.iter().filter(|r| r.signal == Signal::Hold).count();
        let sell_count = results.iter().filter(|r| r.signal == Signal::Sell).count();
        let total = results.len();
        let max_count = buy_count.max(hold_count).max(sell_count);

        EnsembleConsensus {
            buy_count,
            hold_count,
            sell_count,
            total_models: total,
            consensus_rate: if total > 0 {
                max_count as f64 / total as f64
            } else {
                0.0
            },
            is_unanimous: total > 0 && max_count == total,
            is_majority: max_count * 2 > total,
        }
    }
}

impl Default for EnsemblePredictor {
    fn default() -> Self {
        Self::new()
    }
}

use crate::application::orchestrator::{BackendOverride, HybridOrchestrator};
use crate::domain::errors::ValidationError;
use crate::domain::risk::RiskManager;
use crate::domain::types::{
    FeatureVector, MarketSnapshot, MetricMap, ResponseMetadata, Signal,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Coarse market regime label derived from RSI and volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarketCondition {
    Oversold,
    Overbought,
    Volatile,
    Sideways,
}

impl MarketCondition {
    pub fn classify(rsi: f64, volatility: f64) -> Self {
        if rsi < 30.0 {
            MarketCondition::Oversold
        } else if rsi > 70.0 {
            MarketCondition::Overbought
        } else if volatility > 3.0 {
            MarketCondition::Volatile
        } else {
            MarketCondition::Sideways
        }
    }
}

impl fmt::Display for MarketCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketCondition::Oversold => write!(f, "Oversold"),
            MarketCondition::Overbought => write!(f, "Overbought"),
            MarketCondition::Volatile => write!(f, "Volatile"),
            MarketCondition::Sideways => write!(f, "Sideways"),
        }
    }
}

/// Final, risk-adjusted trading decision handed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TradingDecision {
    pub signal: Signal,
    /// Confidence as a percentage (0-100).
    pub confidence: f64,
    pub entry_price: Decimal,
    pub position_size: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reasoning: String,
    pub risk_score: f64,
    pub risk_factors: HashMap<String, f64>,
    pub market_condition: MarketCondition,
    pub source: String,
    pub metadata: ResponseMetadata,
}

/// Caller stage on top of the orchestrator: obtains a signal, sizes it
/// through the risk manager and labels the market regime. The predictor's
/// own stop levels take precedence over the risk manager's when present.
pub struct InferenceService {
    orchestrator: Arc<HybridOrchestrator>,
    risk_manager: RiskManager,
}

impl InferenceService {
    pub fn new(orchestrator: Arc<HybridOrchestrator>, risk_manager: RiskManager) -> Self {
        Self {
            orchestrator,
            risk_manager,
        }
    }

    pub fn orchestrator(&self) -> &HybridOrchestrator {
        &self.orchestrator
    }

    pub async fn infer(
        &self,
        snapshot: &MarketSnapshot,
        features: &FeatureVector,
        sentiment: Option<&MetricMap>,
        on_chain: Option<&MetricMap>,
        force: Option<BackendOverride>,
    ) -> Result<TradingDecision, ValidationError> {
        let response = self
            .orchestrator
            .get_trading_signal(snapshot, features, sentiment, on_chain, force)
            .await?;

        let signal = response.prediction.signal;
        let confidence = response.prediction.confidence * 100.0;
        let volatility = features.get_or("volatility", 1.0);
        let rsi = features.get_or("rsi", 50.0);

        let assessment = self.risk_manager.assess(
            signal,
            confidence,
            snapshot.price,
            volatility,
            rsi,
            snapshot.bid_ask_spread,
        )?;

        info!(
            "inference complete: {} ({:.0}%) via {}, risk {:.0}, {}ms",
            signal,
            confidence,
            response.prediction.source,
            assessment.risk_score,
            response.metadata.response_time_ms
        );

        Ok(TradingDecision {
            signal,
            confidence,
            entry_price: snapshot.price,
            position_size: assessment.position_size,
            stop_loss: response.prediction.stop_loss.or(assessment.stop_loss),
            take_profit: response.prediction.take_profit.or(assessment.take_profit),
            reasoning: response.prediction.reasoning,
            risk_score: assessment.risk_score,
            risk_factors: assessment.risk_factors,
            market_condition: MarketCondition::classify(rsi, volatility),
            source: response.prediction.source,
            metadata: response.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::OrchestratorConfig;
    use crate::domain::errors::InferenceError;
    use crate::domain::ports::RemoteSignalService;
    use crate::domain::privacy::SanitizedRequest;
    use crate::domain::types::PredictionResult;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct NeverRemote;

    #[async_trait]
    impl RemoteSignalService for NeverRemote {
        async fn analyze(
            &self,
            _request: &SanitizedRequest,
        ) -> Result<PredictionResult, InferenceError> {
            panic!("remote must not be called in this test");
        }
    }

    fn service() -> InferenceService {
        let orchestrator = Arc::new(HybridOrchestrator::new(
            Arc::new(NeverRemote),
            OrchestratorConfig::default(),
        ));
        InferenceService::new(orchestrator, RiskManager::default())
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
    async fn test_simple_scenario_produces_sized_decision() {
        let service = service();
        let features = FeatureVector::from([
            ("rsi", 15.0),
            ("volume_ratio", 2.5),
            ("volatility", 0.8),
        ]);

        let decision = service
            .infer(&snapshot(), &features, None, None, None)
            .await
            .unwrap();

        assert_eq!(decision.signal, Signal::Buy);
        assert!(decision.confidence >= 60.0);
        assert!(decision.position_size >= dec!(100));
        assert!(decision.position_size <= dec!(10000));
        // Predictor brackets win over the risk manager's.
        assert!(decision.stop_loss.unwrap() < decision.entry_price);
        assert_eq!(decision.market_condition, MarketCondition::Oversold);
        assert_eq!(decision.source, "local_rules");
    }

    #[tokio::test]
    async fn test_hold_decision_falls_back_to_risk_brackets() {
        let service = service();
        // No directional votes: local model holds, with no brackets of its
        // own and none from the risk manager either.
        let features = FeatureVector::from([("rsi", 60.0), ("volatility", 1.5)]);

        let decision = service
            .infer(&snapshot(), &features, None, None, None)
            .await
            .unwrap();

        assert_eq!(decision.signal, Signal::Hold);
        assert!(decision.stop_loss.is_none());
        assert!(decision.take_profit.is_none());
        assert_eq!(decision.market_condition, MarketCondition::Sideways);
    }
}

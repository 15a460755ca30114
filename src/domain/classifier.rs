use crate::domain::types::{FeatureVector, MarketSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scenario complexity label driving backend selection: clear technical
/// setups go to the cheap deterministic path, ambiguous or volatile
/// conditions to the higher-cost remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// Stateless scenario classifier. Priority-ordered rules, first match wins;
/// total over any input (missing indicators take neutral defaults).
pub struct ScenarioClassifier;

impl ScenarioClassifier {
    pub fn classify(_snapshot: &MarketSnapshot, features: &FeatureVector) -> (Complexity, String) {
        let rsi = features.get_or("rsi", 50.0);
        let volume_ratio = features.get_or("volume_ratio", 1.0);
        let volatility = features.get_or("volatility", 1.0);
        let macd = features.get_or("macd", 0.0);
        let macd_signal = features.get_or("macd_signal", 0.0);

        // 1. Extreme RSI confirmed by a volume surge: unambiguous setup.
        if (rsi > 80.0 || rsi < 20.0) && volume_ratio > 2.0 {
            return (
                Complexity::Simple,
                format!(
                    "extreme RSI {rsi:.1} with volume surge {volume_ratio:.1}x"
                ),
            );
        }

        // 2. Clear directional lean in a calm market.
        if rsi > 30.0 && rsi < 70.0 && volatility < 1.0 && (rsi > 65.0 || rsi < 35.0) {
            return (
                Complexity::Simple,
                format!("directional RSI {rsi:.1} in calm market (volatility {volatility:.2}%)"),
            );
        }

        // 3. High volatility regime.
        if volatility > 3.0 {
            return (
                Complexity::Complex,
                format!("high volatility regime ({volatility:.2}%)"),
            );
        }

        // 4. Neutral RSI: no directional edge.
        if rsi > 45.0 && rsi < 55.0 {
            return (
                Complexity::Complex,
                format!("neutral RSI {rsi:.1}, no directional edge"),
            );
        }

        // 5. RSI and MACD disagree on direction.
        let macd_bullish = macd > 0.0 && macd > macd_signal;
        let macd_bearish = macd < 0.0 && macd < macd_signal;
        if (rsi < 40.0 && macd_bearish) || (rsi > 60.0 && macd_bullish) {
            return (
                Complexity::Complex,
                format!("directional conflict: RSI {rsi:.1} vs MACD {macd:.3}"),
            );
        }

        (
            Complexity::Simple,
            "no complexity triggers matched".to_string(),
        )
    }
}

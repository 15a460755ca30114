use crate::domain::types::{
    FeatureVector, MarketSnapshot, PredictionResult, ProbabilityTriple, Signal,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Source tag attached to every local result.
pub const LOCAL_SOURCE: &str = "local_rules";

/// Position-size ladder shared by backends that report only a confidence:
/// fraction of account keyed by confidence band.
pub fn position_ladder(confidence: f64) -> f64 {
    if confidence < 0.6 {
        0.1
    } else if confidence < 0.7 {
        0.2
    } else if confidence < 0.8 {
        0.3
    } else {
        0.5
    }
}

/// Deterministic, dependency-free signal generator over a fixed set of
/// technical-indicator rules. Always available; never fails.
#[derive(Debug, Clone, Default)]
pub struct LocalRuleModel;

impl LocalRuleModel {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(&self, snapshot: &MarketSnapshot, features: &FeatureVector) -> PredictionResult {
        let rsi = features.get_or("rsi", 50.0);
        let macd = features.get_or("macd", 0.0);
        let macd_signal = features.get_or("macd_signal", 0.0);
        let bb_position = features.get_or("bb_position", 0.5);
        let volume_ratio = features.get_or("volume_ratio", 1.0);

        let mut votes: Vec<Signal> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();

        if rsi > 70.0 {
            votes.push(Signal::Sell);
            reasons.push(format!("RSI overbought ({rsi:.1})"));
        } else if rsi < 30.0 {
            votes.push(Signal::Buy);
            reasons.push(format!("RSI oversold ({rsi:.1})"));
        }

        if macd > 0.0 && macd > macd_signal {
            votes.push(Signal::Buy);
            reasons.push("MACD bullish cross".to_string());
        } else if macd < 0.0 && macd < macd_signal {
            votes.push(Signal::Sell);
            reasons.push("MACD bearish cross".to_string());
        }

        if bb_position > 0.9 {
            votes.push(Signal::Sell);
            reasons.push(format!("price at upper Bollinger band ({bb_position:.2})"));
        } else if bb_position < 0.1 {
            votes.push(Signal::Buy);
            reasons.push(format!("price at lower Bollinger band ({bb_position:.2})"));
        }

        let volume_confirmed = volume_ratio > 1.5;
        if volume_confirmed {
            reasons.push(format!("volume confirmation ({volume_ratio:.1}x average)"));
        }

        let buy_votes = votes.iter().filter(|v| **v == Signal::Buy).count() as i32;
        let sell_votes = votes.iter().filter(|v| **v == Signal::Sell).count() as i32;
        let margin = (buy_votes - sell_votes).abs();

        let signal = if buy_votes > sell_votes {
            Signal::Buy
        } else if sell_votes > buy_votes {
            Signal::Sell
        } else {
            Signal::Hold
        };

        let confidence = if signal == Signal::Hold {
            0.5
        } else {
            let mut confidence = 0.6 + 0.1 * f64::from(margin);
            if volume_confirmed {
                confidence += 0.1;
            }
            if rsi > 80.0 || rsi < 20.0 {
                confidence += 0.15;
            }
            confidence.clamp(0.5, 0.95)
        };

        let (stop_loss, take_profit) = Self::stop_levels(signal, confidence, snapshot.price);

        let reasoning = if reasons.is_empty() {
            "no strong technical signals".to_string()
        } else {
            reasons.join("; ")
        };

        PredictionResult {
            signal,
            confidence,
            probabilities: ProbabilityTriple::from_confidence(signal, confidence),
            position_size: position_ladder(confidence),
            stop_loss,
            take_profit,
            reasoning,
            source: LOCAL_SOURCE.to_string(),
        }
    }

    /// Stop/target distances tighten as confidence rises; HOLD carries none.
    fn stop_levels(
        signal: Signal,
        confidence: f64,
        price: Decimal,
    ) -> (Option<Decimal>, Option<Decimal>) {
        if !signal.is_directional() {
            return (None, None);
        }

        let (stop_pct, target_pct) = if confidence >= 0.8 {
            (dec!(0.02), dec!(0.06))
        } else if confidence >= 0.7 {
            (dec!(0.03), dec!(0.06))
        } else {
            (dec!(0.03), dec!(0.045))
        };

        match signal {
            Signal::Buy => (
                Some(price * (Decimal::ONE - stop_pct)),
                Some(price * (Decimal::ONE + target_pct)),
            ),
            _ => (
                Some(price * (Decimal::ONE + stop_pct)),
                Some(price * (Decimal::ONE - target_pct)),
            ),
        }
    }
}

use crate::domain::errors::ValidationError;
use crate::domain::risk::RiskConfig;
use crate::domain::types::Signal;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::HashMap;

/// Risk evaluation of a single signal: bounded position size, optional
/// bracket levels and a 0-100 risk score with its sub-factors.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub position_size: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub risk_factors: HashMap<String, f64>,
}

/// Converts a signal, its confidence and market statistics into a bounded
/// position size, bracket pair and risk score. Pure besides the fixed config.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Assess a signal. `confidence` is a percentage in [0, 100];
    /// `volatility` and `rsi` come straight from the feature vector.
    pub fn assess(
        &self,
        signal: Signal,
        confidence: f64,
        price: Decimal,
        volatility: f64,
        rsi: f64,
        spread: Decimal,
    ) -> Result<RiskAssessment, ValidationError> {
        if !(0.0..=100.0).contains(&confidence) {
            return Err(ValidationError::OutOfRange {
                field: "confidence",
                value: confidence,
                min: 0.0,
                max: 100.0,
            });
        }
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice { value: price });
        }

        let volatility_risk = Self::volatility_risk(volatility);
        let confidence_risk = 100.0 - confidence;
        let rsi_risk = Self::directional_rsi_risk(signal, rsi);
        let spread_risk = Self::spread_risk(spread, price);

        let risk_score = (volatility_risk + confidence_risk + rsi_risk + spread_risk) / 4.0;

        let mut risk_factors = HashMap::new();
        risk_factors.insert("volatility".to_string(), volatility_risk);
        risk_factors.insert("confidence".to_string(), confidence_risk);
        risk_factors.insert("rsi_direction".to_string(), rsi_risk);
        risk_factors.insert("spread".to_string(), spread_risk);

        let size_factor = (confidence / 100.0) * (1.0 - risk_score / 100.0 * 0.5);
        let position_size = (self.config.base_position_size
            * Decimal::from_f64(size_factor).unwrap_or(Decimal::ZERO))
        .clamp(self.config.min_position_size, self.config.max_position_size);

        let (stop_loss, take_profit) = self.bracket_levels(signal, price, volatility);

        Ok(RiskAssessment {
            risk_score,
            position_size,
            stop_loss,
            take_profit,
            risk_factors,
        })
    }

    /// Stepped volatility score: thresholds at 1/3/5 percent.
    fn volatility_risk(volatility: f64) -> f64 {
        if volatility < 1.0 {
            20.0
        } else if volatility < 3.0 {
            40.0
        } else if volatility < 5.0 {
            60.0
        } else {
            80.0
        }
    }

    /// Penalizes buying into overbought and selling into oversold conditions.
    fn directional_rsi_risk(signal: Signal, rsi: f64) -> f64 {
        match signal {
            Signal::Buy => {
                if rsi > 80.0 {
                    70.0
                } else if rsi > 70.0 {
                    40.0
                } else {
                    20.0
                }
            }
            Signal::Sell => {
                if rsi < 20.0 {
                    70.0
                } else if rsi < 30.0 {
                    40.0
                } else {
                    20.0
                }
            }
            Signal::Hold | Signal::Close => 20.0,
        }
    }

    /// Relative spread score: thresholds at 0.05/0.1/0.2 percent of price.
    fn spread_risk(spread: Decimal, price: Decimal) -> f64 {
        let spread_pct = (spread / price).to_f64().unwrap_or(0.0) * 100.0;
        if spread_pct < 0.05 {
            10.0
        } else if spread_pct < 0.1 {
            20.0
        } else if spread_pct < 0.2 {
            40.0
        } else {
            60.0
        }
    }

    /// Bracket distances widen with volatility, multiplier clamped to [1, 3].
    fn bracket_levels(
        &self,
        signal: Signal,
        price: Decimal,
        volatility: f64,
    ) -> (Option<Decimal>, Option<Decimal>) {
        if !signal.is_directional() {
            return (None, None);
        }

        let multiplier =
            Decimal::from_f64((volatility / 2.0).clamp(1.0, 3.0)).unwrap_or(Decimal::ONE);
        let stop_pct =
            Decimal::from_f64(self.config.base_stop_loss_pct).unwrap_or(Decimal::ZERO) * multiplier;
        let target_pct = Decimal::from_f64(self.config.base_take_profit_pct)
            .unwrap_or(Decimal::ZERO)
            * multiplier;

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

impl Default for RiskManager {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

//! Risk sizing configuration value object.
//!
//! Validated on construction so the risk manager can assume its bounds are
//! coherent.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskConfigError {
    #[error("Invalid percentage: {field} = {value}. Must be between 0.0 and 1.0 exclusive")]
    InvalidPercentage { field: String, value: f64 },

    #[error("Invalid size bound: {field} = {value}. Must be positive")]
    InvalidSize { field: String, value: Decimal },

    #[error("Inverted size bounds: min {min} > max {max}")]
    InvertedBounds { min: Decimal, max: Decimal },
}

/// Position sizing and bracket parameters.
///
/// # Invariants
///
/// - `0 < min_position_size <= max_position_size`
/// - `base_position_size` positive
/// - `base_stop_loss_pct` / `base_take_profit_pct` in (0.0, 1.0)
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Nominal position size before confidence/risk scaling (account units).
    pub base_position_size: Decimal,

    /// Hard floor on any computed position size.
    pub min_position_size: Decimal,

    /// Hard ceiling on any computed position size.
    pub max_position_size: Decimal,

    /// Stop-loss distance at volatility multiplier 1 (e.g. 0.02 = 2%).
    pub base_stop_loss_pct: f64,

    /// Take-profit distance at volatility multiplier 1 (e.g. 0.05 = 5%).
    pub base_take_profit_pct: f64,
}

impl RiskConfig {
    pub fn new(
        base_position_size: Decimal,
        min_position_size: Decimal,
        max_position_size: Decimal,
        base_stop_loss_pct: f64,
        base_take_profit_pct: f64,
    ) -> Result<Self, RiskConfigError> {
        let config = Self {
            base_position_size,
            min_position_size,
            max_position_size,
            base_stop_loss_pct,
            base_take_profit_pct,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RiskConfigError> {
        for (field, value) in [
            ("base_position_size", self.base_position_size),
            ("min_position_size", self.min_position_size),
            ("max_position_size", self.max_position_size),
        ] {
            if value <= Decimal::ZERO {
                return Err(RiskConfigError::InvalidSize {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.min_position_size > self.max_position_size {
            return Err(RiskConfigError::InvertedBounds {
                min: self.min_position_size,
                max: self.max_position_size,
            });
        }

        for (field, value) in [
            ("base_stop_loss_pct", self.base_stop_loss_pct),
            ("base_take_profit_pct", self.base_take_profit_pct),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(RiskConfigError::InvalidPercentage {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_position_size: dec!(1000),
            min_position_size: dec!(100),
            max_position_size: dec!(10000),
            base_stop_loss_pct: 0.02,
            base_take_profit_pct: 0.05,
        }
    }
}

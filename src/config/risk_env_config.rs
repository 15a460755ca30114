use anyhow::{Result, anyhow};
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

/// Risk sizing settings. Percentages are expressed as percent values
/// (`STOP_LOSS_PCT=2.0` means 2%), converted to fractions for the domain
/// config.
#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    pub base_position_size: f64,
    pub min_position_size: f64,
    pub max_position_size: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl RiskEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_position_size: parse_env("BASE_POSITION_SIZE", 1000.0)?,
            min_position_size: parse_env("MIN_POSITION_SIZE", 100.0)?,
            max_position_size: parse_env("MAX_POSITION_SIZE", 10000.0)?,
            stop_loss_pct: parse_env("STOP_LOSS_PCT", 2.0)?,
            take_profit_pct: parse_env("TAKE_PROFIT_PCT", 5.0)?,
        })
    }
}

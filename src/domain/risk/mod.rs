mod manager;
mod risk_config;

pub use manager::{RiskAssessment, RiskManager};
pub use risk_config::{RiskConfig, RiskConfigError};

use crate::domain::types::{FeatureVector, MarketSnapshot, MetricMap};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Technical-indicator names allowed to leave the process boundary. Anything
/// outside this set is dropped silently (not an error).
pub const FEATURE_WHITELIST: &[&str] = &[
    "sma_5",
    "sma_10",
    "sma_20",
    "sma_50",
    "sma_200",
    "ema_12",
    "ema_26",
    "macd",
    "macd_signal",
    "macd_hist",
    "rsi",
    "rsi_6",
    "rsi_14",
    "stoch_k",
    "stoch_d",
    "cci",
    "bb_upper",
    "bb_middle",
    "bb_lower",
    "bb_position",
    "bb_width",
    "atr",
    "volume_ratio",
    "obv",
    "mfi",
    "adx",
    "williams_r",
    "volatility",
];

/// Sentiment metric names allowed outbound.
pub const SENTIMENT_WHITELIST: &[&str] = &[
    "fear_greed_index",
    "social_sentiment",
    "news_sentiment",
    "funding_sentiment",
];

/// On-chain metric names allowed outbound.
pub const ONCHAIN_WHITELIST: &[&str] = &[
    "exchange_inflow",
    "exchange_outflow",
    "active_addresses",
    "transaction_volume",
    "nvt_ratio",
];

/// Key fragments that must never appear in an outbound payload, matched
/// case-insensitively at any nesting depth. `wallet` rather than `address`
/// so the whitelisted `active_addresses` metric never collides.
const SENSITIVE_KEY_TERMS: &[&str] = &[
    "account",
    "user_id",
    "userid",
    "username",
    "user_name",
    "wallet",
    "balance",
    "position_size",
    "pnl",
    "profit_loss",
    "api_key",
    "apikey",
    "secret",
    "password",
    "credential",
    "private_key",
    "auth_token",
];

/// Market fields retained for the remote backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedMarket {
    pub symbol: String,
    pub price: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    pub volume_24h: Decimal,
    pub bid_ask_spread: Decimal,
    pub funding_rate: f64,
}

/// Payload cleared by the anonymizer; the only shape the remote port accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedRequest {
    pub market: SanitizedMarket,
    pub features: FeatureVector,
    pub sentiment: Option<MetricMap>,
    pub on_chain: Option<MetricMap>,
}

impl SanitizedRequest {
    /// JSON view of the payload, used for the independent blacklist scan.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Whitelist-based anonymizer applied before any data is sent to a remote
/// backend.
#[derive(Debug, Clone)]
pub struct DataAnonymizer {
    generalize_symbol: bool,
}

impl DataAnonymizer {
    pub fn new(generalize_symbol: bool) -> Self {
        Self { generalize_symbol }
    }

    /// Strip everything outside the fixed whitelists.
    pub fn anonymize(
        &self,
        snapshot: &MarketSnapshot,
        features: &FeatureVector,
        sentiment: Option<&MetricMap>,
        on_chain: Option<&MetricMap>,
    ) -> SanitizedRequest {
        let symbol = if self.generalize_symbol {
            "ASSET".to_string()
        } else {
            snapshot.symbol.clone()
        };

        let mut safe_features = FeatureVector::new();
        for (name, value) in features.iter() {
            if FEATURE_WHITELIST.contains(&name.as_str()) {
                safe_features.insert(name.clone(), *value);
            }
        }

        SanitizedRequest {
            market: SanitizedMarket {
                symbol,
                price: snapshot.price,
                high_24h: snapshot.high_24h,
                low_24h: snapshot.low_24h,
                volume_24h: snapshot.volume_24h,
                bid_ask_spread: snapshot.bid_ask_spread,
                funding_rate: snapshot.funding_rate,
            },
            features: safe_features,
            sentiment: sentiment.map(|metrics| Self::filter_metrics(metrics, SENTIMENT_WHITELIST)),
            on_chain: on_chain.map(|metrics| Self::filter_metrics(metrics, ONCHAIN_WHITELIST)),
        }
    }

    /// Bypass used when anonymization is disabled by configuration. The
    /// blacklist validator is skipped as well, matching the original
    /// pass-through semantics.
    pub fn passthrough(
        snapshot: &MarketSnapshot,
        features: &FeatureVector,
        sentiment: Option<&MetricMap>,
        on_chain: Option<&MetricMap>,
    ) -> SanitizedRequest {
        SanitizedRequest {
            market: SanitizedMarket {
                symbol: snapshot.symbol.clone(),
                price: snapshot.price,
                high_24h: snapshot.high_24h,
                low_24h: snapshot.low_24h,
                volume_24h: snapshot.volume_24h,
                bid_ask_spread: snapshot.bid_ask_spread,
                funding_rate: snapshot.funding_rate,
            },
            features: features.clone(),
            sentiment: sentiment.cloned(),
            on_chain: on_chain.cloned(),
        }
    }

    fn filter_metrics(metrics: &MetricMap, whitelist: &[&str]) -> MetricMap {
        metrics
            .iter()
            .filter(|(name, _)| whitelist.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Outcome of the final blacklist scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub is_safe: bool,
    /// Dotted path of every offending key, e.g. `on_chain.wallet_address`.
    pub offending_paths: Vec<String>,
}

/// Independent validator run on the sanitized payload just before it leaves
/// the process. A match at any depth is a hard abort of the remote path;
/// the gate fails closed and never auto-redacts.
pub struct SensitiveDataValidator;

impl SensitiveDataValidator {
    pub fn validate(payload: &Value) -> ValidationOutcome {
        let mut offending = Vec::new();
        Self::scan(payload, "", &mut offending);
        ValidationOutcome {
            is_safe: offending.is_empty(),
            offending_paths: offending,
        }
    }

    fn scan(value: &Value, path: &str, offending: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    if Self::is_sensitive_key(key) {
                        offending.push(child_path.clone());
                    }
                    Self::scan(child, &child_path, offending);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    Self::scan(item, &format!("{path}[{index}]"), offending);
                }
            }
            _ => {}
        }
    }

    fn is_sensitive_key(key: &str) -> bool {
        let lowered = key.to_lowercase();
        SENSITIVE_KEY_TERMS.iter().any(|term| lowered.contains(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3200),
            high_24h: dec!(3300),
            low_24h: dec!(3100),
            volume_24h: dec!(850000),
            bid_ask_spread: dec!(0.2),
            funding_rate: -0.0002,
        }
    }

    #[test]
    fn test_anonymize_drops_non_whitelisted_features() {
        let features = FeatureVector::from([
            ("rsi", 55.0),
            ("macd", 0.4),
            ("my_secret_alpha_factor", 0.9),
            ("entry_hint", 1.0),
        ]);
        let anonymizer = DataAnonymizer::new(false);
        let sanitized = anonymizer.anonymize(&snapshot(), &features, None, None);

        assert_eq!(sanitized.features.len(), 2);
        assert!(sanitized.features.contains("rsi"));
        assert!(sanitized.features.contains("macd"));
        assert!(!sanitized.features.contains("my_secret_alpha_factor"));
    }

    #[test]
    fn test_anonymize_filters_sentiment_and_onchain_metrics() {
        let mut sentiment = MetricMap::new();
        sentiment.insert("fear_greed_index".to_string(), json!(62));
        sentiment.insert("trader_id".to_string(), json!("t-1193"));

        let mut on_chain = MetricMap::new();
        on_chain.insert("active_addresses".to_string(), json!(910_000));
        on_chain.insert("whale_watchlist".to_string(), json!(["0xabc"]));

        let anonymizer = DataAnonymizer::new(false);
        let sanitized = anonymizer.anonymize(
            &snapshot(),
            &FeatureVector::new(),
            Some(&sentiment),
            Some(&on_chain),
        );

        let sentiment = sanitized.sentiment.unwrap();
        assert_eq!(sentiment.len(), 1);
        assert!(sentiment.contains_key("fear_greed_index"));

        let on_chain = sanitized.on_chain.unwrap();
        assert_eq!(on_chain.len(), 1);
        assert!(on_chain.contains_key("active_addresses"));
    }

    #[test]
    fn test_symbol_generalization() {
        let anonymizer = DataAnonymizer::new(true);
        let sanitized = anonymizer.anonymize(&snapshot(), &FeatureVector::new(), None, None);
        assert_eq!(sanitized.market.symbol, "ASSET");
    }

    #[test]
    fn test_validator_flags_nested_blacklisted_keys() {
        let payload = json!({
            "market": { "symbol": "BTCUSDT", "price": 50000.0 },
            "on_chain": {
                "wallet_address": "0xdeadbeef",
                "active_addresses": 1000
            }
        });
        let outcome = SensitiveDataValidator::validate(&payload);
        assert!(!outcome.is_safe);
        assert_eq!(
            outcome.offending_paths,
            vec!["on_chain.wallet_address".to_string()]
        );
    }

    #[test]
    fn test_validator_is_case_insensitive() {
        let payload = json!({ "Account_Balance": 12000.0 });
        let outcome = SensitiveDataValidator::validate(&payload);
        assert!(!outcome.is_safe);
        // Both "account" and "balance" match the same key; one path entry.
        assert_eq!(outcome.offending_paths, vec!["Account_Balance".to_string()]);
    }

    #[test]
    fn test_validator_scans_arrays() {
        let payload = json!({
            "positions": [ { "api_key": "sk-123" } ]
        });
        let outcome = SensitiveDataValidator::validate(&payload);
        assert!(!outcome.is_safe);
        assert_eq!(
            outcome.offending_paths,
            vec!["positions[0].api_key".to_string()]
        );
    }

    #[test]
    fn test_validator_accepts_sanitized_payload() {
        let anonymizer = DataAnonymizer::new(false);
        let sanitized = anonymizer.anonymize(
            &snapshot(),
            &FeatureVector::from([("rsi", 48.0), ("active_addresses_ratio", 1.1)]),
            None,
            None,
        );
        let outcome = SensitiveDataValidator::validate(&sanitized.to_value());
        assert!(outcome.is_safe, "offending: {:?}", outcome.offending_paths);
    }
}

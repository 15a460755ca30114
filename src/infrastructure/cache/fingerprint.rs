use crate::domain::types::{FeatureVector, MarketSnapshot};
use md5::{Digest, Md5};
use serde::Serialize;
use std::collections::BTreeMap;

const KEY_PREFIX: &str = "ai_signal";

/// Canonical key source: fixed field order, sorted feature names, values
/// rendered at 2-decimal granularity so equal rounded inputs always hash
/// identically.
#[derive(Serialize)]
struct KeySource<'a> {
    symbol: &'a str,
    price: String,
    features: BTreeMap<&'a str, String>,
}

/// Deterministic fingerprint of (symbol, rounded price, rounded sorted
/// features) used as the cache key.
pub fn cache_key(snapshot: &MarketSnapshot, features: &FeatureVector) -> String {
    let source = KeySource {
        symbol: &snapshot.symbol,
        price: format!("{:.2}", snapshot.price.round_dp(2)),
        features: features
            .iter()
            .map(|(name, value)| (name.as_str(), format!("{value:.2}")))
            .collect(),
    };

    let canonical = serde_json::to_string(&source).unwrap_or_default();
    let digest = Md5::digest(canonical.as_bytes());
    format!("{KEY_PREFIX}:{}", hex::encode(digest))
}

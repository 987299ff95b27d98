//! Deterministic cache keys for explanation inputs

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::ExplainInputs;

pub const KEY_PREFIX: &str = "llm:";

/// Fields are declared in sorted order; maps are sorted by key.
#[derive(Serialize)]
struct CanonicalInputs<'a> {
    feature_values: BTreeMap<&'a str, String>,
    fraud_probability: String,
    top_negative_factors: BTreeMap<&'a str, String>,
    top_positive_factors: BTreeMap<&'a str, String>,
}

/// Fixed 9-decimal rendering with `-0` folded into `0`
fn canonical_number(value: f64) -> String {
    let rendered = format!("{:.9}", value);
    match rendered.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => unsigned.to_string(),
        _ => rendered,
    }
}

fn canonical_map<'a>(entries: impl Iterator<Item = (&'a str, f64)>) -> BTreeMap<&'a str, String> {
    entries.map(|(name, value)| (name, canonical_number(value))).collect()
}

/// Canonical text form of the inputs
pub fn canonicalize(inputs: &ExplainInputs) -> String {
    let canonical = CanonicalInputs {
        feature_values: canonical_map(inputs.feature_values.iter().map(|(k, v)| (k.as_str(), *v))),
        fraud_probability: canonical_number(inputs.fraud_probability),
        top_negative_factors: canonical_map(inputs.top_negative_factors.iter()),
        top_positive_factors: canonical_map(inputs.top_positive_factors.iter()),
    };

    // only strings and maps of strings, serialization cannot fail
    serde_json::to_string(&canonical).unwrap_or_default()
}

/// Cache key: `llm:` followed by the SHA-256 hex of the canonical form
pub fn fingerprint(inputs: &ExplainInputs) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(inputs).as_bytes());
    format!("{}{:x}", KEY_PREFIX, hasher.finalize())
}

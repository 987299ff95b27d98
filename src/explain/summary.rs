//! Attribution summarizer
//!
//! Ranks per-feature contributions by magnitude and splits the strongest ones
//! into factors pushing towards fraud and factors pushing away from it.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Guards the risk score against an all-zero attribution vector
pub const RISK_EPSILON: f64 = 1e-9;

pub const DEFAULT_TOP_K: usize = 5;

/// Named contributions that serialize as a JSON object, keeping rank order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Factors(Vec<(String, f64)>);

impl Factors {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for Factors {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Factors(iter.into_iter().collect())
    }
}

impl Serialize for Factors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RiskSummary {
    pub top_positive_factors: Factors,
    pub top_negative_factors: Factors,
    pub shap_contributions: Factors,
    pub risk_score: f64,
}

/// Summarize an attribution vector.
///
/// `None` stands for a missing attribution engine and is treated as all zeros.
/// Names and scores are paired up to the shorter of the two.
pub fn summarize(attributions: Option<&[f64]>, feature_names: &[String], top_k: usize) -> RiskSummary {
    let zeros;
    let scores = match attributions {
        Some(values) => values,
        None => {
            zeros = vec![0.0; feature_names.len()];
            &zeros[..]
        }
    };

    // non-finite contributions carry no usable signal
    let pairs: Vec<(String, f64)> = feature_names
        .iter()
        .cloned()
        .zip(scores.iter().map(|&v| if v.is_finite() { v } else { 0.0 }))
        .collect();

    let mut ranked: Vec<&(String, f64)> = pairs.iter().collect();
    // stable: equal magnitudes keep request order
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    ranked.truncate(top_k);

    let top_positive_factors = ranked
        .iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let top_negative_factors = ranked
        .iter()
        .filter(|(_, v)| *v < 0.0)
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    let values: Vec<f64> = pairs.iter().map(|(_, v)| *v).collect();
    let risk_score = risk_score(&values);

    RiskSummary {
        top_positive_factors,
        top_negative_factors,
        shap_contributions: pairs.into_iter().collect(),
        risk_score,
    }
}

/// Share of positive mass, `pos / (|total| + eps)`, in `[0, 1]`.
///
/// Expects finite values. Sums that overflow are recomputed relative to the
/// largest magnitude.
fn risk_score(values: &[f64]) -> f64 {
    let positive: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let total: f64 = values.iter().map(|v| v.abs()).sum();
    if total.is_finite() {
        return (positive / (total + RISK_EPSILON)).clamp(0.0, 1.0);
    }

    let max = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let positive: f64 = values.iter().filter(|v| **v > 0.0).map(|v| v / max).sum();
    let total: f64 = values.iter().map(|v| v.abs() / max).sum();
    (positive / total).clamp(0.0, 1.0)
}

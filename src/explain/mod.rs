//! Risk summarization and natural-language explanation

pub mod agent;
pub mod fingerprint;
pub mod prompt;
pub mod summary;

pub use agent::{ExplanationAgent, FALLBACK_NARRATIVE};
pub use summary::{summarize, Factors, RiskSummary, DEFAULT_TOP_K};

/// Everything the narrative is generated from
#[derive(Debug, Clone)]
pub struct ExplainInputs {
    pub fraud_probability: f64,
    pub top_positive_factors: Factors,
    pub top_negative_factors: Factors,
    /// Raw request values keyed by feature name, in request order
    pub feature_values: Vec<(String, f64)>,
}

impl ExplainInputs {
    pub fn new(fraud_probability: f64, summary: &RiskSummary, feature_values: Vec<(String, f64)>) -> Self {
        Self {
            fraud_probability,
            top_positive_factors: summary.top_positive_factors.clone(),
            top_negative_factors: summary.top_negative_factors.clone(),
            feature_values,
        }
    }
}

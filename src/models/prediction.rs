//! Prediction response model

use serde::Serialize;

use crate::explain::{Factors, RiskSummary};

const HIGH_RISK_THRESHOLD: f64 = 0.8;
const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if probability >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub fraud_probability: f64,
    pub top_positive_factors: Factors,
    pub top_negative_factors: Factors,
    pub shap_contributions: Factors,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub llm_explanation: String,
}

impl PredictionResponse {
    pub fn new(fraud_probability: f64, summary: RiskSummary, llm_explanation: String) -> Self {
        Self {
            fraud_probability,
            risk_level: RiskLevel::from_probability(fraud_probability),
            top_positive_factors: summary.top_positive_factors,
            top_negative_factors: summary.top_negative_factors,
            shap_contributions: summary.shap_contributions,
            risk_score: summary.risk_score,
            llm_explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::summarize;

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.399), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.8), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn serializes_every_field() {
        let names = vec!["V14".to_string(), "V4".to_string()];
        let summary = summarize(Some(&[0.6, -0.2][..]), &names, 5);
        let response = PredictionResponse::new(0.93, summary, "narrative".to_string());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["top_positive_factors"]["V14"], 0.6);
        assert_eq!(json["top_negative_factors"]["V4"], -0.2);
        assert_eq!(json["shap_contributions"].as_object().unwrap().len(), 2);
        assert_eq!(json["llm_explanation"], "narrative");
    }
}

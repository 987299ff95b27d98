//! Transaction request model

use std::collections::HashSet;

use serde::Deserialize;
use validator::Validate;

use crate::AppError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransactionRequest {
    #[validate(length(min = 1, message = "at least one feature is required"))]
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl TransactionRequest {
    /// Check field rules and the pairing between values and names
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.features.len() != self.feature_names.len() {
            return Err(AppError::ValidationError(format!(
                "Invalid features: {} values but {} feature names",
                self.features.len(),
                self.feature_names.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.feature_names.len());
        if let Some(dup) = self.feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AppError::ValidationError(format!(
                "Invalid features: duplicate feature name '{}'",
                dup
            )));
        }

        Ok(())
    }

    /// Feature values keyed by name, in request order
    pub fn feature_values(&self) -> Vec<(String, f64)> {
        self.feature_names
            .iter()
            .cloned()
            .zip(self.features.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(features: Vec<f64>, names: &[&str]) -> TransactionRequest {
        TransactionRequest {
            features,
            feature_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_matching_lengths() {
        let req = request(vec![0.0, 149.62], &["Time", "Amount"]);
        assert!(req.check().is_ok());
        assert_eq!(
            req.feature_values(),
            vec![("Time".to_string(), 0.0), ("Amount".to_string(), 149.62)]
        );
    }

    #[test]
    fn rejects_length_mismatch() {
        let req = request(vec![1.0, 2.0, 3.0, 4.0, 5.0], &["a", "b", "c", "d"]);
        match req.check() {
            Err(AppError::ValidationError(msg)) => assert!(msg.contains("5 values but 4")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(matches!(request(vec![], &[]).check(), Err(AppError::ValidationError(_))));
        assert!(matches!(
            request(vec![1.0, 2.0], &["V1", "V1"]).check(),
            Err(AppError::ValidationError(_))
        ));
    }
}

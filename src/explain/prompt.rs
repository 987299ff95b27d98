//! Prompt text sent to the LLM providers

use std::fmt::Write;

use super::{ExplainInputs, Factors};

const TASK: &str = "Task:
1. Give a professional fraud analyst explanation.
2. Rewrite it in simple customer-friendly language.
3. Provide recommended next steps.";

fn indicator_lines(factors: &Factors) -> String {
    if factors.is_empty() {
        return "None".to_string();
    }
    factors
        .iter()
        .map(|(name, value)| format!("- {}: {:.3}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn value_lines(values: &[(String, f64)]) -> String {
    if values.is_empty() {
        return "None".to_string();
    }
    values
        .iter()
        .map(|(name, value)| format!("- {}: {:?}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(inputs: &ExplainInputs) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Fraud Probability: {:.3}", inputs.fraud_probability);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Top Positive Indicators:");
    let _ = writeln!(prompt, "{}", indicator_lines(&inputs.top_positive_factors));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Top Negative Indicators:");
    let _ = writeln!(prompt, "{}", indicator_lines(&inputs.top_negative_factors));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Feature Values:");
    let _ = writeln!(prompt, "{}", value_lines(&inputs.feature_values));
    let _ = writeln!(prompt);
    prompt.push_str(TASK);

    prompt.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_every_section() {
        let inputs = ExplainInputs {
            fraud_probability: 0.87654,
            top_positive_factors: vec![("V14".to_string(), 0.91234)].into_iter().collect(),
            top_negative_factors: Factors::default(),
            feature_values: vec![("Time".to_string(), 0.0), ("Amount".to_string(), 149.62)],
        };

        let expected = "Fraud Probability: 0.877

Top Positive Indicators:
- V14: 0.912

Top Negative Indicators:
None

Feature Values:
- Time: 0.0
- Amount: 149.62

Task:
1. Give a professional fraud analyst explanation.
2. Rewrite it in simple customer-friendly language.
3. Provide recommended next steps.";

        assert_eq!(build_prompt(&inputs), expected);
    }

    #[test]
    fn empty_inputs_render_none() {
        let inputs = ExplainInputs {
            fraud_probability: 0.0,
            top_positive_factors: Factors::default(),
            top_negative_factors: Factors::default(),
            feature_values: Vec::new(),
        };

        let prompt = build_prompt(&inputs);
        assert!(prompt.starts_with("Fraud Probability: 0.000"));
        assert_eq!(prompt.matches("\nNone\n").count(), 3);
    }
}

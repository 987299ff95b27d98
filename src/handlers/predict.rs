//! Scoring and explanation handler

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::explain::{summarize, ExplainInputs};
use crate::models::{PredictionResponse, TransactionRequest};
use crate::{AppError, AppResult, AppState};

/// Score a transaction, summarize its attributions and narrate the result
pub async fn predict_and_explain(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let Json(req) = payload?;
    req.check()?;

    let artifacts = Arc::clone(&state.artifacts);
    let features = req.features.clone();
    let names = req.feature_names.clone();
    let scored = tokio::task::spawn_blocking(move || artifacts.score(&features, &names))
        .await
        .map_err(|e| AppError::InternalError(format!("Scoring task failed: {}", e)))??;

    if scored.fraud_probability.is_nan() {
        return Err(AppError::InferenceError("Classifier returned NaN".to_string()));
    }
    let fraud_probability = scored.fraud_probability.clamp(0.0, 1.0);

    let summary = summarize(scored.attributions.as_deref(), &req.feature_names, state.config.top_k);
    let inputs = ExplainInputs::new(fraud_probability, &summary, req.feature_values());
    let narrative = state.agent.explain(&inputs).await;

    tracing::info!(
        fraud_probability,
        risk_score = summary.risk_score,
        features = req.features.len(),
        "Transaction explained"
    );

    Ok(Json(PredictionResponse::new(fraud_probability, summary, narrative)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::explain::{ExplanationAgent, FALLBACK_NARRATIVE};
    use crate::inference::testing::{BrokenAttribution, EchoAttribution, FixedClassifier, PassthroughScaler};
    use crate::inference::{AttributionEngine, ModelArtifacts};
    use crate::{create_router, AppState};

    use super::*;

    struct Harness {
        router: Router,
        classifier: Arc<FixedClassifier>,
    }

    fn harness(width: usize, probability: f64, attribution: Option<Arc<dyn AttributionEngine>>) -> Harness {
        let classifier = Arc::new(FixedClassifier::new(probability));
        let artifacts = ModelArtifacts::new(
            Arc::new(PassthroughScaler { expected: width }),
            classifier.clone(),
            attribution,
            "test-model",
        );

        let mut config = Config::from_env();
        config.top_k = 5;

        let state = AppState {
            config,
            artifacts: Arc::new(artifacts),
            agent: Arc::new(ExplanationAgent::new(Vec::new(), None, Duration::from_secs(60))),
        };

        Harness {
            router: create_router(state),
            classifier,
        }
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict_and_explain")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let h = harness(2, 0.1, None);
        let response = h
            .router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn length_mismatch_is_rejected_before_scoring() {
        let h = harness(5, 0.5, None);
        let body = json!({
            "features": [1.0, 2.0, 3.0, 4.0, 5.0],
            "feature_names": ["a", "b", "c", "d"],
        });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("5 values but 4"));
        assert_eq!(json["status"], 400);
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let h = harness(2, 0.5, None);

        let response = h.router.clone().oneshot(post("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["detail"].is_string());

        let wrong_type = json!({ "features": "abc", "feature_names": ["a"] });
        let response = h.router.oneshot(post(wrong_type.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn scaler_width_mismatch_is_bad_request() {
        let h = harness(3, 0.5, None);
        let body = json!({ "features": [1.0, 2.0], "feature_names": ["a", "b"] });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn composes_full_response() {
        let h = harness(3, 0.92, Some(Arc::new(EchoAttribution)));
        let body = json!({
            "features": [0.5, -0.25, 0.0],
            "feature_names": ["V14", "V4", "Amount"],
        });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["fraud_probability"], 0.92);
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["top_positive_factors"], json!({ "V14": 0.5 }));
        assert_eq!(json["top_negative_factors"], json!({ "V4": -0.25 }));
        assert_eq!(json["shap_contributions"].as_object().unwrap().len(), 3);
        let risk = json["risk_score"].as_f64().unwrap();
        assert!((risk - 0.5 / 0.75).abs() < 1e-6);
        assert_eq!(json["llm_explanation"], FALLBACK_NARRATIVE);
        assert_eq!(h.classifier.calls(), 1);
    }

    #[tokio::test]
    async fn probability_is_clamped() {
        let h = harness(1, 1.7, None);
        let body = json!({ "features": [3.0], "feature_names": ["Amount"] });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();
        let json = body_json(response).await;

        assert_eq!(json["fraud_probability"], 1.0);
        assert_eq!(json["risk_level"], "high");
    }

    #[tokio::test]
    async fn failing_attribution_degrades_to_zero() {
        let h = harness(2, 0.3, Some(Arc::new(BrokenAttribution)));
        let body = json!({ "features": [1.0, 2.0], "feature_names": ["a", "b"] });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["top_positive_factors"], json!({}));
        assert_eq!(json["top_negative_factors"], json!({}));
        assert_eq!(json["shap_contributions"], json!({ "a": 0.0, "b": 0.0 }));
        assert_eq!(json["risk_score"], 0.0);
        assert_eq!(json["risk_level"], "low");
    }

    #[tokio::test]
    async fn overflowing_attributions_keep_response_numeric() {
        let h = harness(2, 0.6, Some(Arc::new(EchoAttribution)));
        let body = json!({ "features": [1e39, 1.0], "feature_names": ["Amount", "V1"] });

        let response = h.router.oneshot(post(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["shap_contributions"], json!({ "Amount": 0.0, "V1": 1.0 }));
        assert_eq!(json["top_positive_factors"], json!({ "V1": 1.0 }));
        let risk = json["risk_score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&risk));
    }

    #[tokio::test]
    async fn status_counts_inferences() {
        let h = harness(1, 0.5, None);
        let body = json!({ "features": [1.0], "feature_names": ["a"] });
        let response = h.router.clone().oneshot(post(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h
            .router
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;

        assert_eq!(json["model_name"], "test-model");
        assert_eq!(json["inference_count"], 1);
        assert_eq!(json["attribution_loaded"], false);
        assert_eq!(json["llm_providers"], json!([]));
        assert_eq!(json["cache_backend"], Value::Null);
    }
}

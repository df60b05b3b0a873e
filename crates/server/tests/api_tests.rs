//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use server_lib::{
    Classifier, HealthResponse, MetricsDocument, ModelInfo, ModelScores, PatientData,
    PredictionResponse, Predictor, PredictorError, ReadinessResponse, ServiceMetrics,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Classifier stub with a fixed outcome and a shared invocation counter
struct StubClassifier {
    class: u8,
    probabilities: Option<Vec<f32>>,
    calls: Arc<AtomicUsize>,
}

impl Classifier for StubClassifier {
    fn predict_class(&self, _features: &[f32]) -> Result<u8, PredictorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.class)
    }

    fn class_probabilities(&self, _features: &[f32]) -> Result<Option<Vec<f32>>, PredictorError> {
        Ok(self.probabilities.clone())
    }

    fn n_features(&self) -> usize {
        8
    }

    fn model_type(&self) -> &str {
        "stub"
    }
}

pub struct AppState {
    pub predictor: Predictor,
    pub metrics: ServiceMetrics,
    pub dataset_label: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::ok()))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.predictor.is_loaded() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                reason: None,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                reason: Some("model not loaded".to_string()),
            }),
        )
    }
}

async fn info(State(state): State<Arc<AppState>>) -> Response {
    let Some(model_type) = state.predictor.model_type() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Model not loaded");
    };
    let metrics = state
        .predictor
        .metrics()
        .and_then(|doc| serde_json::to_value(doc).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    let info = ModelInfo {
        model_type: model_type.to_string(),
        dataset: state.dataset_label.clone(),
        features: state.predictor.feature_info(),
        metrics,
    };
    (StatusCode::OK, Json(info)).into_response()
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.predictor.metrics() {
        Some(document) => (StatusCode::OK, Json(document.clone())).into_response(),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Metrics not available"),
    }
}

async fn predict(State(state): State<Arc<AppState>>, body: String) -> Response {
    let payload: PatientData = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid request body: {}", err),
            );
        }
    };

    if let Err(err) = payload.validate() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string());
    }

    let features = payload.to_features();
    let worker_state = state.clone();
    let outcome =
        tokio::task::spawn_blocking(move || worker_state.predictor.predict(&features)).await;

    match outcome {
        Ok(Ok(prediction)) => {
            state
                .metrics
                .observe_prediction_latency(prediction.latency.as_secs_f64());
            state.metrics.inc_predictions();
            (
                StatusCode::OK,
                Json(PredictionResponse::new(prediction.class, prediction.confidence)),
            )
                .into_response()
        }
        Ok(Err(err)) => match err {
            PredictorError::InvalidInput(_) => {
                error_response(StatusCode::BAD_REQUEST, &err.to_string())
            }
            PredictorError::ModelNotLoaded => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
            }
            _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "prediction failed"),
        },
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "prediction failed"),
    }
}

async fn prometheus_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/prometheus", get(prometheus_metrics))
        .with_state(state)
}

fn sample_metrics_document() -> MetricsDocument {
    let mut metrics = HashMap::new();
    metrics.insert(
        "RandomForest".to_string(),
        ModelScores {
            accuracy: 0.77,
            precision: 0.71,
            recall: 0.58,
            f1_score: 0.64,
        },
    );
    MetricsDocument {
        best_model: "RandomForest".to_string(),
        metrics,
    }
}

/// App with a loaded stub model. Returns the shared invocation counter.
fn setup_loaded_app(
    class: u8,
    probabilities: Option<Vec<f32>>,
    metrics_document: Option<MetricsDocument>,
) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let classifier = StubClassifier {
        class,
        probabilities,
        calls: calls.clone(),
    };
    let predictor = Predictor::with_classifier(Box::new(classifier), metrics_document);
    let state = Arc::new(AppState {
        predictor,
        metrics: ServiceMetrics::new(),
        dataset_label: "Pima Indians Diabetes".to_string(),
    });
    (create_test_router(state), calls)
}

/// App in degraded mode: no model, no metrics document
fn setup_degraded_app() -> Router {
    let state = Arc::new(AppState {
        predictor: Predictor::unloaded(),
        metrics: ServiceMetrics::new(),
        dataset_label: "Pima Indians Diabetes".to_string(),
    });
    create_test_router(state)
}

fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "Pregnancies": 2,
        "Glucose": 120,
        "BloodPressure": 70,
        "SkinThickness": 25,
        "Insulin": 85,
        "BMI": 28.5,
        "DiabetesPedigreeFunction": 0.627,
        "Age": 32
    })
}

async fn post_predict(app: Router, payload: &serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_always_ok() {
    let (app, _) = setup_loaded_app(0, None, None);
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Service is operational");
}

#[tokio::test]
async fn test_health_ok_without_model() {
    let app = setup_degraded_app();
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readyz_ready_when_loaded() {
    let (app, _) = setup_loaded_app(0, None, None);
    let (status, body) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_readyz_503_when_degraded() {
    let app = setup_degraded_app();
    let (status, body) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
    assert_eq!(body["reason"], "model not loaded");
}

#[tokio::test]
async fn test_info_returns_model_details() {
    let (app, _) = setup_loaded_app(0, None, Some(sample_metrics_document()));
    let (status, body) = get_json(app, "/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "RandomForest");
    assert_eq!(body["dataset"], "Pima Indians Diabetes");
    assert_eq!(body["features"].as_array().unwrap().len(), 8);
    assert_eq!(body["metrics"]["best_model"], "RandomForest");
}

#[tokio::test]
async fn test_info_empty_metrics_record_when_unavailable() {
    let (app, _) = setup_loaded_app(0, None, None);
    let (status, body) = get_json(app, "/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "stub");
    assert_eq!(body["metrics"], serde_json::json!({}));
}

#[tokio::test]
async fn test_info_500_when_model_unloaded() {
    let app = setup_degraded_app();
    let (status, body) = get_json(app, "/info").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not loaded");
}

#[tokio::test]
async fn test_metrics_returns_document_unchanged() {
    let (app, _) = setup_loaded_app(1, Some(vec![0.3, 0.7]), Some(sample_metrics_document()));

    // A prediction in between must not change the served document
    let (status, _) = post_predict(app.clone(), &sample_payload()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::to_value(sample_metrics_document()).unwrap()
    );
}

#[tokio::test]
async fn test_metrics_500_when_unavailable() {
    let (app, _) = setup_loaded_app(0, None, None);
    let (status, body) = get_json(app, "/metrics").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Metrics not available");
}

#[tokio::test]
async fn test_predict_valid_payload() {
    let (app, _) = setup_loaded_app(1, Some(vec![0.3, 0.7]), None);
    let (status, body) = post_predict(app, &sample_payload()).await;

    assert_eq!(status, StatusCode::OK);
    let prediction = body["prediction"].as_u64().unwrap();
    assert!(prediction == 0 || prediction == 1);
    assert_eq!(body["result"], "Diabetic");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!((confidence - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn test_predict_result_label_consistent_with_class() {
    let (app, _) = setup_loaded_app(0, Some(vec![0.9, 0.1]), None);
    let (_, body) = post_predict(app, &sample_payload()).await;

    assert_eq!(body["prediction"], 0);
    assert_eq!(body["result"], "Not Diabetic");
}

#[tokio::test]
async fn test_predict_confidence_defaults_to_one() {
    let (app, _) = setup_loaded_app(1, None, None);
    let (status, body) = post_predict(app, &sample_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence"], 1.0);
}

#[tokio::test]
async fn test_predict_is_idempotent() {
    let (app, _) = setup_loaded_app(1, Some(vec![0.35, 0.65]), None);

    let (_, first) = post_predict(app.clone(), &sample_payload()).await;
    let (_, second) = post_predict(app, &sample_payload()).await;

    assert_eq!(first["prediction"], second["prediction"]);
    assert_eq!(first["confidence"], second["confidence"]);
}

#[tokio::test]
async fn test_predict_rejects_negative_field_before_model() {
    let (app, calls) = setup_loaded_app(1, None, None);

    let mut payload = sample_payload();
    payload["Glucose"] = serde_json::json!(-5);

    let (status, body) = post_predict(app, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Glucose"));
    assert_eq!(calls.load(Ordering::Relaxed), 0, "model must not be invoked");
}

#[tokio::test]
async fn test_predict_age_zero_rejected_age_one_accepted() {
    let (app, _) = setup_loaded_app(0, None, None);

    let mut payload = sample_payload();
    payload["Age"] = serde_json::json!(0);
    let (status, _) = post_predict(app.clone(), &payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    payload["Age"] = serde_json::json!(1);
    let (status, _) = post_predict(app, &payload).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_predict_missing_field_rejected() {
    let (app, calls) = setup_loaded_app(0, None, None);

    let mut payload = sample_payload();
    payload.as_object_mut().unwrap().remove("Insulin");

    let (status, body) = post_predict(app, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid request body"));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_predict_non_json_body_rejected() {
    let (app, _) = setup_loaded_app(0, None, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_500_when_model_unloaded() {
    let app = setup_degraded_app();
    let (status, body) = post_predict(app, &sample_payload()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "model not loaded");
}

#[tokio::test]
async fn test_prometheus_endpoint_returns_text_format() {
    let (app, _) = setup_loaded_app(1, Some(vec![0.2, 0.8]), None);

    let (status, _) = post_predict(app.clone(), &sample_payload()).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/prometheus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("diabetes_api_prediction_latency_seconds"));
    assert!(text.contains("diabetes_api_predictions_total"));
}

//! HTTP API for the prediction service

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use server_lib::{
    HealthResponse, ModelInfo, PatientData, PredictionResponse, Predictor, PredictorError,
    ReadinessResponse, ServiceMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub predictor: Predictor,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub dataset_label: String,
}

impl AppState {
    pub fn new(
        predictor: Predictor,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        dataset_label: String,
    ) -> Self {
        Self {
            predictor,
            metrics,
            logger,
            dataset_label,
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Liveness probe - always ok, independent of model state
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::ok()))
}

/// Readiness probe - 200 once the model is loaded, 503 while degraded
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

/// Model information: type, dataset, feature names, evaluation metrics
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

/// Offline evaluation metrics, exactly as loaded at startup
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.predictor.metrics() {
        Some(document) => (StatusCode::OK, Json(document.clone())).into_response(),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Metrics not available"),
    }
}

/// Run one prediction
///
/// The body is parsed and range-validated before the predictor is
/// invoked; the CPU-bound inference call runs on a blocking worker so it
/// never stalls the async executor.
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
            state.logger.log_prediction(
                prediction.class,
                prediction.confidence,
                prediction.latency.as_secs_f64() * 1000.0,
            );

            (
                StatusCode::OK,
                Json(PredictionResponse::new(prediction.class, prediction.confidence)),
            )
                .into_response()
        }
        Ok(Err(err)) => {
            state.metrics.inc_prediction_errors();
            match err {
                PredictorError::InvalidInput(_) => {
                    error_response(StatusCode::BAD_REQUEST, &err.to_string())
                }
                PredictorError::ModelNotLoaded => {
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
                }
                other => {
                    // Internal details are logged, never sent to the client
                    error!(error = %other, "Prediction failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "prediction failed")
                }
            }
        }
        Err(join_err) => {
            state.metrics.inc_prediction_errors();
            error!(error = %join_err, "Prediction worker panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "prediction failed")
        }
    }
}

/// Prometheus metrics endpoint
async fn prometheus() -> impl IntoResponse {
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

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/prometheus", get(prometheus))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

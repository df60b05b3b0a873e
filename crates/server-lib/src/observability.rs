//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction counts, model info)
//! - Structured JSON logging with tracing

use prometheus::{register_gauge_vec, register_histogram, register_int_gauge, GaugeVec, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntGauge,
    prediction_errors_total: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "diabetes_api_prediction_latency_seconds",
                "Time spent running classifier inference",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_gauge!(
                "diabetes_api_predictions_total",
                "Total number of successful predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_gauge!(
                "diabetes_api_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            model_info: register_gauge_vec!(
                "diabetes_api_model_info",
                "Information about the currently loaded model",
                &["model_type", "loaded"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Increment the successful-predictions counter
    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Increment the failed-predictions counter
    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    /// Record which model is loaded (or that none is)
    pub fn set_model_info(&self, model_type: &str, loaded: bool) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[model_type, if loaded { "true" } else { "false" }])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, predictions,
/// and shutdown.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_loaded: bool, model_type: Option<&str>) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_loaded = model_loaded,
            model_type = model_type.unwrap_or("none"),
            started_at = %chrono::Utc::now().to_rfc3339(),
            "Prediction service started"
        );
    }

    /// Log a startup that continues without a usable model artifact
    pub fn log_degraded_start(&self, reason: &str) {
        warn!(
            event = "degraded_start",
            service = %self.service,
            reason = %reason,
            "Model artifact unavailable, serving in degraded mode"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, class: u8, confidence: f32, latency_ms: f64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            class = class,
            confidence = confidence,
            latency_ms = latency_ms,
            "Served prediction"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}

//! Diabetes Prediction API
//!
//! Serves predictions from a pre-trained binary classifier over the
//! Pima Indians Diabetes feature vector, plus health probes, model
//! information, and offline evaluation metrics.

use anyhow::Result;
use server_lib::{Predictor, ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SERVICE_NAME: &str = "diabetes-api";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting diabetes-api");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(
        port = config.api_port,
        model_path = %config.model_path.display(),
        metrics_path = %config.metrics_path.display(),
        "Service configured"
    );

    let logger = StructuredLogger::new(SERVICE_NAME);

    // Load the model artifact once, before traffic is accepted. A missing
    // or unusable artifact keeps the process running in degraded mode:
    // /health stays ok, model-dependent endpoints fail fast.
    let predictor = match Predictor::load(&config.model_path, &config.metrics_path) {
        Ok(predictor) => predictor,
        Err(err) => {
            logger.log_degraded_start(&err.to_string());
            Predictor::unloaded()
        }
    };

    // Initialize metrics
    let metrics = ServiceMetrics::new();
    metrics.set_model_info(
        predictor.model_type().unwrap_or("none"),
        predictor.is_loaded(),
    );

    logger.log_startup(SERVICE_VERSION, predictor.is_loaded(), predictor.model_type());

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        predictor,
        metrics,
        logger.clone(),
        config.dataset_label.clone(),
    ));

    // Start the API server
    tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, read from DIABETES_API_* environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listen port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path to the serialized classifier artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Path to the offline evaluation metrics document
    #[serde(default = "default_metrics_path")]
    pub metrics_path: PathBuf,

    /// Dataset label reported by GET /info
    #[serde(default = "default_dataset_label")]
    pub dataset_label: String,
}

fn default_api_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/diabetes_model.onnx")
}

fn default_metrics_path() -> PathBuf {
    PathBuf::from("model/metrics.json")
}

fn default_dataset_label() -> String {
    "Pima Indians Diabetes".to_string()
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DIABETES_API"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServiceConfig {
            api_port: default_api_port(),
            model_path: default_model_path(),
            metrics_path: default_metrics_path(),
            dataset_label: default_dataset_label(),
        }))
    }
}

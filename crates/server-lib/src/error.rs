//! Error taxonomy for the prediction service

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the predictor and its backends
#[derive(Debug, Error)]
pub enum PredictorError {
    /// The model artifact file does not exist at the configured path.
    /// The service continues in degraded mode when this happens at startup.
    #[error("model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// The artifact exists but could not be parsed as an ONNX graph
    #[error("model artifact could not be loaded: {0}")]
    ArtifactInvalid(String),

    /// A model-dependent operation was invoked without a loaded model
    #[error("model not loaded")]
    ModelNotLoaded,

    /// The caller supplied an input the model cannot accept
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference run itself failed
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictorError {
    /// Returns true for conditions caused by the caller rather than
    /// by server state. Used to pick between 400 and 500 responses.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictorError::InvalidInput(_))
    }
}

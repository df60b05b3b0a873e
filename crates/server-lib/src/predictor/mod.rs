//! Prediction engine
//!
//! The [`Predictor`] owns one classifier backend and the offline metrics
//! document, loaded once at startup and read-only afterward. Backends
//! implement the [`Classifier`] capability trait; probability support is
//! resolved once at load time, not probed per call.

mod onnx;

pub use onnx::OnnxClassifier;

use crate::error::PredictorError;
use crate::models::MetricsDocument;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Capability interface for classifier backends
pub trait Classifier: Send + Sync {
    /// Predict the class label (0 or 1) for one feature row
    fn predict_class(&self, features: &[f32]) -> Result<u8, PredictorError>;

    /// Per-class probability distribution for one feature row, if the
    /// backend exposes one. `Ok(None)` means the capability is absent.
    fn class_probabilities(&self, features: &[f32]) -> Result<Option<Vec<f32>>, PredictorError> {
        let _ = features;
        Ok(None)
    }

    /// Input arity the backend was built for
    fn n_features(&self) -> usize;

    /// Feature names declared by the backend, if any
    fn feature_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Short label describing the backend
    fn model_type(&self) -> &str;
}

/// One prediction outcome
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted class, 0 or 1
    pub class: u8,
    /// Probability mass assigned to the predicted class, or 1.0 when the
    /// backend has no probability capability
    pub confidence: f32,
    /// Wall-clock inference time, for instrumentation only
    pub latency: Duration,
}

/// The one process-wide prediction service
///
/// Two states only: unloaded (no classifier) or loaded. The transition
/// happens exactly once, before traffic is accepted, and is never
/// reversed during the process's life.
pub struct Predictor {
    classifier: Option<Box<dyn Classifier>>,
    metrics: Option<MetricsDocument>,
}

impl Predictor {
    /// Load the model artifact and metrics document from disk.
    ///
    /// A missing or unparsable artifact is an error; the caller is
    /// expected to log it and continue with [`Predictor::unloaded`]. A
    /// missing or malformed metrics document is not an error and only
    /// degrades metrics to unavailable.
    pub fn load(model_path: &Path, metrics_path: &Path) -> Result<Self, PredictorError> {
        let classifier = OnnxClassifier::load(model_path)?;

        if !classifier.supports_probabilities() {
            warn!(
                model_path = %model_path.display(),
                "Model artifact has no probability output, confidences will read 1.0"
            );
        }

        let metrics = load_metrics_document(metrics_path);

        Ok(Self {
            classifier: Some(Box::new(classifier)),
            metrics,
        })
    }

    /// Degraded-mode predictor: every model-dependent call fails fast
    pub fn unloaded() -> Self {
        Self {
            classifier: None,
            metrics: None,
        }
    }

    /// Construct from an already-built backend. Used for tests and for
    /// wiring alternative backends at the composition root.
    pub fn with_classifier(
        classifier: Box<dyn Classifier>,
        metrics: Option<MetricsDocument>,
    ) -> Self {
        Self {
            classifier: Some(classifier),
            metrics,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    /// Run one prediction over a fixed-arity feature row
    pub fn predict(&self, features: &[f32]) -> Result<Prediction, PredictorError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(PredictorError::ModelNotLoaded)?;

        if features.len() != classifier.n_features() {
            return Err(PredictorError::InvalidInput(format!(
                "expected {} features, got {}",
                classifier.n_features(),
                features.len()
            )));
        }

        let start = Instant::now();
        let class = classifier.predict_class(features)?;

        let confidence = match classifier.class_probabilities(features)? {
            Some(probabilities) => {
                probabilities
                    .get(class as usize)
                    .copied()
                    .ok_or_else(|| {
                        PredictorError::Inference(format!(
                            "probability output has {} entries, predicted class {}",
                            probabilities.len(),
                            class
                        ))
                    })?
            }
            // No probability capability: keep the original service's
            // 1.0 default for wire compatibility.
            None => 1.0,
        };

        let latency = start.elapsed();
        debug!(class = class, confidence = confidence, elapsed_us = latency.as_micros(), "Inference completed");

        Ok(Prediction {
            class,
            confidence,
            latency,
        })
    }

    /// The metrics document, if one was loaded at startup
    pub fn metrics(&self) -> Option<&MetricsDocument> {
        self.metrics.as_ref()
    }

    /// Label describing the loaded model, best-model name preferred
    pub fn model_type(&self) -> Option<&str> {
        let classifier = self.classifier.as_ref()?;
        Some(
            self.metrics
                .as_ref()
                .map(|m| m.best_model.as_str())
                .unwrap_or_else(|| classifier.model_type()),
        )
    }

    /// Feature names for GET /info.
    ///
    /// Fallback chain: backend-declared names, then synthesized
    /// `feature_{i}` names sized to the backend's arity, then a single
    /// unknown placeholder. An unloaded predictor returns an
    /// informational placeholder rather than an error.
    pub fn feature_info(&self) -> Vec<String> {
        let Some(classifier) = self.classifier.as_ref() else {
            return vec!["model not loaded".to_string()];
        };

        if let Some(names) = classifier.feature_names() {
            return names;
        }

        let arity = classifier.n_features();
        if arity > 0 {
            (0..arity).map(|i| format!("feature_{}", i)).collect()
        } else {
            vec!["unknown".to_string()]
        }
    }
}

/// Read the metrics document produced by the offline training pipeline.
///
/// Missing and malformed files both degrade to `None`; neither is fatal.
pub fn load_metrics_document(path: &Path) -> Option<MetricsDocument> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Metrics document not available");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Metrics document is malformed, ignoring");
            None
        }
    }
}

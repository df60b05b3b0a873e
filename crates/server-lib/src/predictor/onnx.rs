//! ONNX classifier backend using tract
//!
//! Loads the serialized classifier exported by the offline training
//! pipeline (skl2onnx with zipmap disabled, so the probability output is
//! a plain tensor). Probability support is resolved once at load time
//! from the graph's declared output count.

use super::Classifier;
use crate::error::PredictorError;
use crate::models::NUM_FEATURES;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::info;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// tract-backed classifier over a single-row float input
#[derive(Debug)]
pub struct OnnxClassifier {
    plan: TractModel,
    /// True when the graph declares a probability tensor alongside the
    /// label output
    has_probabilities: bool,
    n_features: usize,
}

impl OnnxClassifier {
    /// Load and optimize the ONNX artifact at `path`.
    ///
    /// Distinguishes a missing file ([`PredictorError::ArtifactMissing`])
    /// from one that exists but cannot be parsed or optimized
    /// ([`PredictorError::ArtifactInvalid`]).
    pub fn load(path: &Path) -> Result<Self, PredictorError> {
        if !path.exists() {
            return Err(PredictorError::ArtifactMissing(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| PredictorError::ArtifactInvalid(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let checksum = hex::encode(hasher.finalize());

        let (plan, output_count) = Self::build_plan(&bytes)
            .map_err(|e| PredictorError::ArtifactInvalid(format!("{:#}", e)))?;

        info!(
            event = "model_loaded",
            path = %path.display(),
            checksum = %checksum,
            size_bytes = bytes.len(),
            outputs = output_count,
            loaded_at = %chrono::Utc::now().to_rfc3339(),
            "Model artifact loaded"
        );

        Ok(Self {
            plan,
            has_probabilities: output_count >= 2,
            n_features: NUM_FEATURES,
        })
    }

    fn build_plan(bytes: &[u8]) -> Result<(TractModel, usize)> {
        let typed = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?;

        let output_count = typed.outputs.len();
        let plan = typed
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok((plan, output_count))
    }

    /// Whether the artifact carries a probability output
    pub fn supports_probabilities(&self) -> bool {
        self.has_probabilities
    }

    fn run(&self, features: &[f32]) -> Result<TVec<TValue>, PredictorError> {
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.n_features), features.to_vec())
                .map_err(|e| PredictorError::InvalidInput(e.to_string()))?
                .into();

        self.plan
            .run(tvec!(input.into()))
            .map_err(|e| PredictorError::Inference(e.to_string()))
    }
}

impl Classifier for OnnxClassifier {
    fn predict_class(&self, features: &[f32]) -> Result<u8, PredictorError> {
        let outputs = self.run(features)?;
        let label = outputs
            .first()
            .ok_or_else(|| PredictorError::Inference("no label output from model".to_string()))?;

        // skl2onnx emits the label as an int64 tensor
        let label = label
            .cast_to::<i64>()
            .map_err(|e| PredictorError::Inference(e.to_string()))?;
        let view = label
            .to_array_view::<i64>()
            .map_err(|e| PredictorError::Inference(e.to_string()))?;
        let class = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| PredictorError::Inference("empty label output".to_string()))?;

        if class == 0 || class == 1 {
            Ok(class as u8)
        } else {
            Err(PredictorError::Inference(format!(
                "model produced class {}, expected 0 or 1",
                class
            )))
        }
    }

    fn class_probabilities(&self, features: &[f32]) -> Result<Option<Vec<f32>>, PredictorError> {
        if !self.has_probabilities {
            return Ok(None);
        }

        let outputs = self.run(features)?;
        let tensor = outputs.get(1).ok_or_else(|| {
            PredictorError::Inference("no probability output from model".to_string())
        })?;

        let tensor = tensor
            .cast_to::<f32>()
            .map_err(|e| PredictorError::Inference(e.to_string()))?;
        let view = tensor
            .to_array_view::<f32>()
            .map_err(|e| PredictorError::Inference(e.to_string()))?;

        Ok(Some(view.iter().copied().collect()))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn model_type(&self) -> &str {
        "onnx"
    }
}

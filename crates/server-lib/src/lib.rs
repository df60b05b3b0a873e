//! Core library for the diabetes prediction service
//!
//! This crate provides:
//! - The request/response data models and payload validation
//! - Model artifact loading and ONNX-backed inference
//! - The prediction error taxonomy
//! - Metrics and structured logging

pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::PredictorError;
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{Classifier, OnnxClassifier, Prediction, Predictor};

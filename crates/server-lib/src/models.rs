//! Core data models for the prediction service

use crate::error::PredictorError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of input features expected by the diabetes model
pub const NUM_FEATURES: usize = 8;

/// One patient record, in the Pima Indians Diabetes feature order
///
/// Field names on the wire match the upstream dataset columns exactly
/// (PascalCase, with BMI and DiabetesPedigreeFunction as-is).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientData {
    /// Number of times pregnant
    #[serde(rename = "Pregnancies")]
    pub pregnancies: i64,
    /// Plasma glucose concentration (mg/dL)
    #[serde(rename = "Glucose")]
    pub glucose: i64,
    /// Diastolic blood pressure (mm Hg)
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: i64,
    /// Triceps skinfold thickness (mm)
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: i64,
    /// 2-hour serum insulin (mu U/ml)
    #[serde(rename = "Insulin")]
    pub insulin: i64,
    /// Body mass index (kg/m^2)
    #[serde(rename = "BMI")]
    pub bmi: f64,
    /// Diabetes pedigree function score
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: f64,
    /// Age in years
    #[serde(rename = "Age")]
    pub age: i64,
}

impl PatientData {
    /// Validate field ranges: every field non-negative, age at least 1.
    /// Runs before the model is ever invoked.
    pub fn validate(&self) -> Result<(), PredictorError> {
        let non_negative_ints = [
            ("Pregnancies", self.pregnancies),
            ("Glucose", self.glucose),
            ("BloodPressure", self.blood_pressure),
            ("SkinThickness", self.skin_thickness),
            ("Insulin", self.insulin),
        ];
        for (name, value) in non_negative_ints {
            if value < 0 {
                return Err(PredictorError::InvalidInput(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
        }

        let non_negative_floats = [
            ("BMI", self.bmi),
            ("DiabetesPedigreeFunction", self.diabetes_pedigree_function),
        ];
        for (name, value) in non_negative_floats {
            if !value.is_finite() || value < 0.0 {
                return Err(PredictorError::InvalidInput(format!(
                    "{} must be a finite number >= 0, got {}",
                    name, value
                )));
            }
        }

        if self.age < 1 {
            return Err(PredictorError::InvalidInput(format!(
                "Age must be >= 1, got {}",
                self.age
            )));
        }

        Ok(())
    }

    /// Flatten into the fixed-order feature row the model was trained on
    pub fn to_features(&self) -> [f32; NUM_FEATURES] {
        [
            self.pregnancies as f32,
            self.glucose as f32,
            self.blood_pressure as f32,
            self.skin_thickness as f32,
            self.insulin as f32,
            self.bmi as f32,
            self.diabetes_pedigree_function as f32,
            self.age as f32,
        ]
    }
}

/// Response body for POST /predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    pub result: String,
    pub confidence: f32,
}

impl PredictionResponse {
    pub fn new(class: u8, confidence: f32) -> Self {
        let result = if class == 1 { "Diabetic" } else { "Not Diabetic" };
        Self {
            prediction: class,
            result: result.to_string(),
            confidence,
        }
    }
}

/// Liveness response - static, independent of model state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Service is operational".to_string(),
        }
    }
}

/// Readiness response - ready only once the model artifact is loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response body for GET /info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub dataset: String,
    pub features: Vec<String>,
    /// Evaluation metrics document, or an empty object when unavailable
    pub metrics: serde_json::Value,
}

/// Offline evaluation scores for one candidate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// The metrics document written by the offline training pipeline
///
/// Served read-only by GET /metrics, exactly as loaded at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub best_model: String,
    pub metrics: HashMap<String, ModelScores>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_patient() -> PatientData {
        PatientData {
            pregnancies: 2,
            glucose: 120,
            blood_pressure: 70,
            skin_thickness: 25,
            insulin: 85,
            bmi: 28.5,
            diabetes_pedigree_function: 0.627,
            age: 32,
        }
    }

    #[test]
    fn test_valid_payload_passes_validation() {
        assert!(sample_patient().validate().is_ok());
    }

    #[test]
    fn test_negative_fields_rejected() {
        let mut patient = sample_patient();
        patient.glucose = -1;
        let err = patient.validate().unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Glucose"));

        let mut patient = sample_patient();
        patient.bmi = -0.1;
        assert!(patient.validate().is_err());
    }

    #[test]
    fn test_age_boundary() {
        let mut patient = sample_patient();
        patient.age = 0;
        assert!(patient.validate().is_err());

        patient.age = 1;
        assert!(patient.validate().is_ok());
    }

    #[test]
    fn test_nan_bmi_rejected() {
        let mut patient = sample_patient();
        patient.bmi = f64::NAN;
        assert!(patient.validate().is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let json = r#"{
            "Pregnancies": 2,
            "Glucose": 120,
            "BloodPressure": 70,
            "SkinThickness": 25,
            "Insulin": 85,
            "BMI": 28.5,
            "DiabetesPedigreeFunction": 0.627,
            "Age": 32
        }"#;
        let patient: PatientData = serde_json::from_str(json).unwrap();
        assert_eq!(patient.glucose, 120);
        assert_eq!(patient.age, 32);

        let value = serde_json::to_value(&patient).unwrap();
        assert!(value.get("BloodPressure").is_some());
        assert!(value.get("DiabetesPedigreeFunction").is_some());
    }

    #[test]
    fn test_feature_order() {
        let features = sample_patient().to_features();
        assert_eq!(features.len(), NUM_FEATURES);
        assert_eq!(features[0], 2.0);
        assert_eq!(features[1], 120.0);
        assert_eq!(features[5], 28.5);
        assert_eq!(features[7], 32.0);
    }

    #[test]
    fn test_prediction_response_labels() {
        let diabetic = PredictionResponse::new(1, 0.9);
        assert_eq!(diabetic.result, "Diabetic");

        let healthy = PredictionResponse::new(0, 0.8);
        assert_eq!(healthy.result, "Not Diabetic");
    }

    #[test]
    fn test_metrics_document_parsing() {
        let json = r#"{
            "best_model": "RandomForest",
            "metrics": {
                "RandomForest": {
                    "accuracy": 0.77,
                    "precision": 0.71,
                    "recall": 0.58,
                    "f1_score": 0.64
                },
                "LogisticRegression": {
                    "accuracy": 0.75,
                    "precision": 0.68,
                    "recall": 0.55,
                    "f1_score": 0.61
                }
            }
        }"#;
        let doc: MetricsDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.best_model, "RandomForest");
        assert_eq!(doc.metrics.len(), 2);
        assert_eq!(doc.metrics["RandomForest"].accuracy, 0.77);
    }
}

//! Linear model artifacts.
//!
//! A trained one-vs-rest model is exported as JSON:
//!
//! ```json
//! {
//!   "type": "linear_svm_ovr",
//!   "version": "1.0",
//!   "feature_order": ["mean_hr", "std_hr", "min_hr", "max_hr", "sdnn", "rmssd"],
//!   "scaler_mean": [...], "scaler_scale": [...],
//!   "classes": ["Amused", "Calm", "Stressed"],
//!   "weights": [[...], [...], [...]],
//!   "bias": [...],
//!   "model_hash": "...", "export_time_utc": "...",
//!   "training_commit": "...", "data_manifest_id": "..."
//! }
//! ```
//!
//! Provenance fields and any unrecognized keys are carried through untouched.

use crate::core::features::FEATURE_COUNT;
use crate::core::types::Emotion;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a model artifact.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Model has no classes")]
    EmptyClasses,
    #[error("Unknown class label '{0}'")]
    UnknownClass(String),
    #[error("Duplicate class label '{0}'")]
    DuplicateClass(String),
    #[error("Expected {expected} classes, found {found}")]
    ClassCount { expected: usize, found: usize },
    #[error("Shape mismatch in {field}: expected {expected}, found {found}")]
    Shape {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

/// Serialized linear model as exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(rename = "type")]
    pub model_type: String,
    pub version: String,
    pub feature_order: Vec<String>,
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
    pub classes: Vec<String>,
    /// Outer index = class, inner index = feature
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_time_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_manifest_id: Option<String>,

    /// Any other keys present in the artifact
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Validated, inference-ready parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinearParams {
    pub classes: Vec<Emotion>,
    pub weights: Vec<[f64; FEATURE_COUNT]>,
    pub bias: Vec<f64>,
    pub means: [f64; FEATURE_COUNT],
    pub scales: [f64; FEATURE_COUNT],
}

impl LinearParams {
    pub fn embedded_default() -> Self {
        Self {
            classes: Emotion::ALL.to_vec(),
            weights: DEFAULT_WEIGHTS.to_vec(),
            bias: DEFAULT_BIAS.to_vec(),
            means: DEFAULT_SCALER_MEAN,
            scales: DEFAULT_SCALER_SCALE,
        }
    }
}

impl ModelArtifact {
    /// Parse an artifact from a JSON string. Does not validate shapes.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse an artifact file. Does not validate shapes.
    pub fn load_from_path(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The compiled-in fallback model.
    pub fn embedded_default() -> Self {
        Self {
            model_type: "linear_svm_ovr".to_string(),
            version: "1.0-embedded".to_string(),
            feature_order: crate::core::features::FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scaler_mean: DEFAULT_SCALER_MEAN.to_vec(),
            scaler_scale: DEFAULT_SCALER_SCALE.to_vec(),
            classes: Emotion::ALL.iter().map(|e| e.as_str().to_string()).collect(),
            weights: DEFAULT_WEIGHTS.iter().map(|w| w.to_vec()).collect(),
            bias: DEFAULT_BIAS.to_vec(),
            model_hash: None,
            export_time_utc: None,
            training_commit: None,
            data_manifest_id: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Check every shape and value constraint the classifier relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.to_params().map(|_| ())
    }

    pub(crate) fn to_params(&self) -> Result<LinearParams, ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::EmptyClasses);
        }
        if self.classes.len() != Emotion::COUNT {
            return Err(ModelError::ClassCount {
                expected: Emotion::COUNT,
                found: self.classes.len(),
            });
        }

        let mut classes = Vec::with_capacity(self.classes.len());
        for label in &self.classes {
            let emotion =
                Emotion::from_label(label).ok_or_else(|| ModelError::UnknownClass(label.clone()))?;
            if classes.contains(&emotion) {
                return Err(ModelError::DuplicateClass(label.clone()));
            }
            classes.push(emotion);
        }

        check_len("feature_order", FEATURE_COUNT, self.feature_order.len())?;
        let means = to_feature_array("scaler_mean", &self.scaler_mean)?;
        let scales = to_feature_array("scaler_scale", &self.scaler_scale)?;

        check_len("weights", classes.len(), self.weights.len())?;
        check_len("bias", classes.len(), self.bias.len())?;

        let weights = self
            .weights
            .iter()
            .enumerate()
            .map(|(i, row)| to_feature_array(&format!("weights[{i}]"), row))
            .collect::<Result<Vec<_>, _>>()?;

        if self.bias.iter().any(|b| !b.is_finite()) {
            return Err(ModelError::NonFinite("bias".to_string()));
        }

        Ok(LinearParams {
            classes,
            weights,
            bias: self.bias.clone(),
            means,
            scales,
        })
    }
}

fn check_len(field: &str, expected: usize, found: usize) -> Result<(), ModelError> {
    if expected != found {
        return Err(ModelError::Shape {
            field: field.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn to_feature_array(field: &str, values: &[f64]) -> Result<[f64; FEATURE_COUNT], ModelError> {
    check_len(field, FEATURE_COUNT, values.len())?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite(field.to_string()));
    }
    let mut out = [0.0; FEATURE_COUNT];
    out.copy_from_slice(values);
    Ok(out)
}

// Embedded fallback parameters, feature order as in FEATURE_NAMES and class
// order as in Emotion::ALL.
const DEFAULT_SCALER_MEAN: [f64; FEATURE_COUNT] = [72.0, 4.0, 65.0, 80.0, 45.0, 35.0];
const DEFAULT_SCALER_SCALE: [f64; FEATURE_COUNT] = [12.0, 2.5, 11.0, 14.0, 18.0, 15.0];
const DEFAULT_WEIGHTS: [[f64; FEATURE_COUNT]; Emotion::COUNT] = [
    // Amused
    [0.62, 0.41, 0.28, 0.53, 0.12, -0.08],
    // Calm
    [-0.81, -0.54, -0.63, -0.72, 0.91, 0.84],
    // Stressed
    [0.93, 0.58, 0.71, 0.82, -0.88, -0.79],
];
const DEFAULT_BIAS: [f64; Emotion::COUNT] = [1.25, 0.34, -0.12];

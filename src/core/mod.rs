//! Core inference pipeline.
//!
//! This module contains:
//! - Sample, prediction and score types
//! - Feature extraction over sample windows
//! - Model artifacts and the linear classifier
//! - Wellness score fusion
//! - The bounded streaming engine tying them together

pub mod classifier;
pub mod engine;
pub mod features;
pub mod model;
pub mod score;
pub mod types;

pub use classifier::{softmax, LinearClassifier};
pub use engine::{EmotionEngine, EngineConfig};
pub use features::{extract_features, FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use model::{ModelArtifact, ModelError};
pub use score::{ScoreConfig, ScoreEngine, QUALITY_DEGRADED, QUALITY_GOOD};
pub use types::{
    Emotion, EmotionPrediction, EmotionProbabilities, EmotionResult, Sample, ScoreResult,
};

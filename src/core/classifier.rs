//! One-vs-rest linear classifier with softmax calibration.
//!
//! Each class has an independent linear discriminant over standardized
//! features. The raw decision scores are turned into a distribution with a
//! softmax. The model is not probabilistic, so these numbers are a calibration
//! heuristic for ranking and gating, not likelihoods.

use crate::core::features::{FeatureVector, FEATURE_COUNT};
use crate::core::model::{LinearParams, ModelArtifact, ModelError};
use crate::core::types::{EmotionPrediction, EmotionProbabilities};
use std::path::Path;

/// Raw scores are clamped to this magnitude so `score - max` stays finite.
const SCORE_LIMIT: f64 = 1e300;

/// Linear emotion classifier backed by an immutable model.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    params: LinearParams,
    artifact: ModelArtifact,
    fallback: bool,
}

impl LinearClassifier {
    /// Build a classifier from an artifact, substituting the embedded default
    /// model if the artifact is malformed.
    pub fn new(artifact: ModelArtifact) -> Self {
        match Self::try_new(artifact) {
            Ok(classifier) => classifier,
            Err(e) => {
                tracing::warn!("Rejected emotion model ({e}); using embedded default weights");
                Self::fallback()
            }
        }
    }

    /// Build a classifier, returning the validation error instead of falling back.
    pub fn try_new(artifact: ModelArtifact) -> Result<Self, ModelError> {
        let params = artifact.to_params()?;
        Ok(Self {
            params,
            artifact,
            fallback: false,
        })
    }

    /// Load a model file, falling back to the embedded default on any error.
    pub fn from_path(path: &Path) -> Self {
        match ModelArtifact::load_from_path(path) {
            Ok(artifact) => Self::new(artifact),
            Err(e) => {
                tracing::warn!(
                    "Could not load emotion model from {}: {e}; using embedded default weights",
                    path.display()
                );
                Self::fallback()
            }
        }
    }

    /// Classifier using the compiled-in default model.
    pub fn with_default_model() -> Self {
        Self {
            params: LinearParams::embedded_default(),
            artifact: ModelArtifact::embedded_default(),
            fallback: false,
        }
    }

    fn fallback() -> Self {
        Self {
            fallback: true,
            ..Self::with_default_model()
        }
    }

    /// The artifact this classifier runs.
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Whether a requested model was rejected and the default substituted.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Standardize features against the model's scaler.
    ///
    /// A zero scale marks the feature inactive. Non-finite results are also zeroed.
    pub fn normalize(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut z = [0.0; FEATURE_COUNT];
        for (i, value) in z.iter_mut().enumerate() {
            let scale = self.params.scales[i];
            if scale == 0.0 {
                continue;
            }
            let v = (features[i] - self.params.means[i]) / scale;
            *value = if v.is_finite() { v } else { 0.0 };
        }
        z
    }

    /// Per-class decision scores in model class order.
    pub fn decision_scores(&self, features: &FeatureVector) -> Vec<f64> {
        let z = self.normalize(features);
        self.params
            .weights
            .iter()
            .zip(&self.params.bias)
            .map(|(w, b)| {
                let score = dot(&z, w) + b;
                if score.is_nan() {
                    0.0
                } else {
                    score.clamp(-SCORE_LIMIT, SCORE_LIMIT)
                }
            })
            .collect()
    }

    pub fn predict(&self, features: &FeatureVector) -> EmotionPrediction {
        let scores = self.decision_scores(features);
        let probs = softmax(&scores);

        let mut probabilities = EmotionProbabilities::default();
        for (emotion, &p) in self.params.classes.iter().zip(&probs) {
            probabilities.set(*emotion, p);
        }

        // Same argmax as the score engine, independent of model class order
        let (label, confidence) = probabilities.dominant();
        EmotionPrediction {
            label,
            confidence,
            probabilities,
        }
    }
}

impl Default for LinearClassifier {
    fn default() -> Self {
        Self::with_default_model()
    }
}

fn dot(a: &[f64; FEATURE_COUNT], b: &[f64; FEATURE_COUNT]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Numerically stable softmax. Falls back to uniform if the input is degenerate.
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if !sum.is_finite() || sum <= 0.0 {
        let p = 1.0 / scores.len() as f64;
        return vec![p; scores.len()];
    }

    exps.iter().map(|&e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Emotion;

    fn assert_valid_distribution(prediction: &EmotionPrediction) {
        let probs = &prediction.probabilities;
        assert!((probs.sum() - 1.0).abs() < 1e-9);
        for (_, p) in probs.iter() {
            assert!((0.0..=1.0).contains(&p));
        }
        assert_eq!(probs.dominant().0, prediction.label);
        assert!((probs.get(prediction.label) - prediction.confidence).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_stability() {
        let probs = softmax(&[1000.0, 1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((probs[0] - probs[1]).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_equal_scores_uniform() {
        let probs = softmax(&[0.5, 0.5, 0.5]);
        for p in probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict_reference_features() {
        let classifier = LinearClassifier::with_default_model();
        let prediction = classifier.predict(&FeatureVector::new([70.0, 5.0, 65.0, 75.0, 50.0, 40.0]));
        assert!(Emotion::ALL.contains(&prediction.label));
        assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);
        assert_valid_distribution(&prediction);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let classifier = LinearClassifier::default();
        let features = FeatureVector::new([85.0, 7.0, 75.0, 98.0, 30.0, 22.0]);
        let first = classifier.predict(&features);
        for _ in 0..10 {
            assert_eq!(classifier.predict(&features), first);
        }
    }

    #[test]
    fn test_physiology_separates_classes() {
        let classifier = LinearClassifier::default();
        let relaxed = classifier.predict(&FeatureVector::new([58.0, 1.5, 55.0, 61.0, 80.0, 70.0]));
        assert_eq!(relaxed.label, Emotion::Calm);

        let aroused = classifier.predict(&FeatureVector::new([110.0, 9.0, 95.0, 125.0, 18.0, 10.0]));
        assert_eq!(aroused.label, Emotion::Stressed);
    }

    #[test]
    fn test_zero_scale_marks_feature_inactive() {
        let mut artifact = ModelArtifact::embedded_default();
        artifact.scaler_scale = vec![0.0; FEATURE_COUNT];
        let classifier = LinearClassifier::try_new(artifact).unwrap();

        let z = classifier.normalize(&FeatureVector::new([70.0, 5.0, 65.0, 75.0, 50.0, 40.0]));
        assert_eq!(z, [0.0; FEATURE_COUNT]);

        // Only the bias remains
        let prediction = classifier.predict(&FeatureVector::zeros());
        assert_eq!(prediction.label, Emotion::Amused);
        assert_valid_distribution(&prediction);
    }

    #[test]
    fn test_extreme_inputs_stay_finite() {
        let classifier = LinearClassifier::default();
        for features in [
            FeatureVector::new([f64::MAX; FEATURE_COUNT]),
            FeatureVector::new([f64::NAN; FEATURE_COUNT]),
            FeatureVector::new([f64::INFINITY, 0.0, f64::NEG_INFINITY, 0.0, 0.0, 0.0]),
        ] {
            let prediction = classifier.predict(&features);
            assert!(prediction.confidence.is_finite());
            assert_valid_distribution(&prediction);
        }
    }

    #[test]
    fn test_malformed_model_falls_back() {
        let mut artifact = ModelArtifact::embedded_default();
        artifact.bias.pop();
        let classifier = LinearClassifier::new(artifact);
        assert!(classifier.is_fallback());
        assert_eq!(classifier.artifact().version, "1.0-embedded");

        let prediction = classifier.predict(&FeatureVector::zeros());
        assert_valid_distribution(&prediction);
    }

    #[test]
    fn test_class_order_follows_artifact() {
        let mut artifact = ModelArtifact::embedded_default();
        artifact.classes.reverse();
        artifact.weights.reverse();
        artifact.bias.reverse();
        let reordered = LinearClassifier::try_new(artifact).unwrap();
        let reference = LinearClassifier::default();

        let features = FeatureVector::new([92.0, 6.0, 80.0, 104.0, 28.0, 20.0]);
        let a = reordered.predict(&features);
        let b = reference.predict(&features);
        assert_eq!(a.label, b.label);
        for emotion in Emotion::ALL {
            assert!((a.probabilities.get(emotion) - b.probabilities.get(emotion)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tied_scores_agree_with_score_engine() {
        let mut artifact = ModelArtifact::embedded_default();
        artifact.classes.reverse();
        artifact.weights.reverse();
        artifact.scaler_scale = vec![0.0; FEATURE_COUNT];
        artifact.bias = vec![0.0; 3];
        let classifier = LinearClassifier::try_new(artifact).unwrap();

        let prediction = classifier.predict(&FeatureVector::new([80.0, 4.0, 70.0, 90.0, 40.0, 30.0]));
        assert_eq!(prediction.label, Emotion::Amused);
        assert!((prediction.confidence - 1.0 / 3.0).abs() < 1e-12);
        assert_valid_distribution(&prediction);

        let score = crate::core::score::ScoreEngine::default().compute_score(
            70.0,
            50.0,
            0.0,
            &prediction.probabilities,
        );
        assert_eq!(score.dominant_emotion, prediction.label);
    }

    #[test]
    fn test_missing_model_file_falls_back() {
        let path = std::env::temp_dir().join("synheart-emotion-no-such-model.json");
        let _ = std::fs::remove_file(&path);
        let classifier = LinearClassifier::from_path(&path);
        assert!(classifier.is_fallback());
    }
}

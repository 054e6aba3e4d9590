//! Wellness impact scoring.
//!
//! Fuses normalized HRV with an emotion-coherence term into a single 0-100
//! score. Pure function of its inputs apart from the output timestamp.

use crate::core::types::{Emotion, EmotionProbabilities, ScoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weights and ranges used by [`ScoreEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// HRV mapped to 0 on the normalized scale (ms)
    pub hrv_min: f64,
    /// HRV mapped to 100 on the normalized scale (ms)
    pub hrv_max: f64,
    pub weight_hrv: f64,
    pub weight_coherence: f64,
    /// Reserved for a recovery component; not part of the current formula
    pub weight_recovery: f64,
    /// Coherence contribution of P(Calm)
    pub coherence_calm: f64,
    /// Coherence contribution of P(Amused)
    pub coherence_amused: f64,
    /// Coherence penalty for P(Stressed)
    pub coherence_stressed: f64,
    /// Lowest plausible heart rate (BPM)
    pub hr_min: f64,
    /// Highest plausible heart rate (BPM)
    pub hr_max: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            hrv_min: 20.0,
            hrv_max: 100.0,
            weight_hrv: 0.5,
            weight_coherence: 0.3,
            weight_recovery: 0.2,
            coherence_calm: 1.0,
            coherence_amused: 0.9,
            coherence_stressed: 0.2,
            hr_min: 40.0,
            hr_max: 200.0,
        }
    }
}

/// Data quality reported when HR is inside the plausible band.
pub const QUALITY_GOOD: f64 = 1.0;
/// Data quality reported when HR is outside the plausible band.
pub const QUALITY_DEGRADED: f64 = 0.5;

/// Combines physiology and emotion probabilities into a wellness score.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    config: ScoreConfig,
}

impl ScoreEngine {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Score the current reading, stamped with the current time.
    ///
    /// `motion` is accepted for interface stability but does not enter the formula.
    pub fn compute_score(
        &self,
        hr: f64,
        hrv: f64,
        motion: f64,
        probabilities: &EmotionProbabilities,
    ) -> ScoreResult {
        self.compute_score_at(hr, hrv, motion, probabilities, Utc::now())
    }

    /// Same as [`compute_score`](Self::compute_score) with an explicit timestamp.
    pub fn compute_score_at(
        &self,
        hr: f64,
        hrv: f64,
        _motion: f64,
        probabilities: &EmotionProbabilities,
        timestamp: DateTime<Utc>,
    ) -> ScoreResult {
        let (dominant_emotion, confidence) = probabilities.dominant();

        let hrv_norm = self.normalize_hrv(hrv);
        let coherence = self.coherence(probabilities);
        let score = clamp_score(
            self.config.weight_hrv * hrv_norm + self.config.weight_coherence * coherence,
        );

        ScoreResult {
            score,
            dominant_emotion,
            emotion_probabilities: *probabilities,
            hr,
            hrv,
            timestamp,
            confidence,
            data_quality: self.data_quality(hr),
        }
    }

    /// Map HRV linearly from the configured range onto 0-100.
    pub fn normalize_hrv(&self, hrv: f64) -> f64 {
        let span = self.config.hrv_max - self.config.hrv_min;
        if span <= 0.0 {
            return 0.0;
        }
        clamp_score((hrv - self.config.hrv_min) / span * 100.0)
    }

    /// Positive emotions raise coherence, stress lowers it. Range 0-100.
    pub fn coherence(&self, probabilities: &EmotionProbabilities) -> f64 {
        let c = &self.config;
        clamp_score(
            (c.coherence_calm * probabilities.get(Emotion::Calm)
                + c.coherence_amused * probabilities.get(Emotion::Amused)
                - c.coherence_stressed * probabilities.get(Emotion::Stressed))
                * 100.0,
        )
    }

    pub fn data_quality(&self, hr: f64) -> f64 {
        if (self.config.hr_min..=self.config.hr_max).contains(&hr) {
            QUALITY_GOOD
        } else {
            QUALITY_DEGRADED
        }
    }
}

/// Clamp to [0, 100], mapping NaN to 0.
fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_reading() {
        let engine = ScoreEngine::default();
        let probs = EmotionProbabilities::new(0.2, 0.7, 0.1);
        let result = engine.compute_score(70.0, 60.0, 0.0, &probs);

        assert!(result.score >= 50.0);
        assert_eq!(result.dominant_emotion, Emotion::Calm);
        assert!((result.confidence - 0.7).abs() < 1e-9);
        assert_eq!(result.data_quality, 1.0);
        // 0.5 * 50 + 0.3 * 86
        assert!((result.score - 50.8).abs() < 1e-9);
    }

    #[test]
    fn test_hrv_normalization() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.normalize_hrv(20.0), 0.0);
        assert_eq!(engine.normalize_hrv(60.0), 50.0);
        assert_eq!(engine.normalize_hrv(100.0), 100.0);
        assert_eq!(engine.normalize_hrv(5.0), 0.0);
        assert_eq!(engine.normalize_hrv(250.0), 100.0);
    }

    #[test]
    fn test_coherence_bounds() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.coherence(&EmotionProbabilities::new(0.0, 0.0, 1.0)), 0.0);
        assert_eq!(engine.coherence(&EmotionProbabilities::new(0.0, 1.0, 0.0)), 100.0);
        assert!((engine.coherence(&EmotionProbabilities::new(1.0, 0.0, 0.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_data_quality_band() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.data_quality(30.0), 0.5);
        assert_eq!(engine.data_quality(40.0), 1.0);
        assert_eq!(engine.data_quality(75.0), 1.0);
        assert_eq!(engine.data_quality(200.0), 1.0);
        assert_eq!(engine.data_quality(201.0), 0.5);
        assert_eq!(engine.data_quality(f64::NAN), 0.5);
    }

    #[test]
    fn test_score_bounded_for_extreme_inputs() {
        let engine = ScoreEngine::default();
        let distributions = [
            EmotionProbabilities::new(1.0, 0.0, 0.0),
            EmotionProbabilities::new(0.0, 1.0, 0.0),
            EmotionProbabilities::new(0.0, 0.0, 1.0),
            EmotionProbabilities::uniform(),
        ];
        for probs in &distributions {
            for hr in [-1e9, 0.0, 39.9, 75.0, 250.0, 1e9] {
                for hrv in [-1e12, 0.0, 20.0, 60.0, 100.0, 1e12] {
                    let result = engine.compute_score(hr, hrv, 0.0, probs);
                    assert!((0.0..=100.0).contains(&result.score));
                    assert!(result.data_quality == 0.5 || result.data_quality == 1.0);
                }
            }
        }
    }

    #[test]
    fn test_motion_does_not_affect_score() {
        // Motion is threaded through but not yet part of the formula.
        let engine = ScoreEngine::default();
        let probs = EmotionProbabilities::new(0.3, 0.5, 0.2);
        let now = Utc::now();
        let still = engine.compute_score_at(80.0, 45.0, 0.0, &probs, now);
        let moving = engine.compute_score_at(80.0, 45.0, 9.5, &probs, now);
        assert_eq!(still, moving);
    }

    #[test]
    fn test_degenerate_hrv_range() {
        let engine = ScoreEngine::new(ScoreConfig {
            hrv_min: 50.0,
            hrv_max: 50.0,
            ..ScoreConfig::default()
        });
        assert_eq!(engine.normalize_hrv(80.0), 0.0);
    }
}

//! Data types flowing through the inference pipeline.
//!
//! Samples go in, emotion results and wellness scores come out. Emotion labels
//! are a closed set so that model class names and scoring weights can never
//! drift apart silently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single physiological reading from the producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Heart rate in beats per minute
    pub hr: f64,
    /// Pre-aggregated heart-rate variability in milliseconds
    pub hrv: f64,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Motion magnitude (accelerometer-derived, unitless)
    #[serde(default)]
    pub motion: f64,
}

impl Sample {
    pub fn new(hr: f64, hrv: f64, timestamp: DateTime<Utc>, motion: f64) -> Self {
        Self {
            hr,
            hrv,
            timestamp,
            motion,
        }
    }

    /// Create a sample stamped with the current time.
    pub fn now(hr: f64, hrv: f64, motion: f64) -> Self {
        Self::new(hr, hrv, Utc::now(), motion)
    }
}

/// Emotional states the classifier can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Amused,
    Calm,
    Stressed,
}

impl Emotion {
    /// Number of supported labels.
    pub const COUNT: usize = 3;

    /// All labels in canonical order.
    pub const ALL: [Emotion; Emotion::COUNT] = [Emotion::Amused, Emotion::Calm, Emotion::Stressed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Amused => "Amused",
            Emotion::Calm => "Calm",
            Emotion::Stressed => "Stressed",
        }
    }

    /// Parse a model class name. Matching ignores case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability assigned to each emotion label.
///
/// Serializes as `{"Amused": p, "Calm": p, "Stressed": p}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionProbabilities {
    #[serde(rename = "Amused", default)]
    pub amused: f64,
    #[serde(rename = "Calm", default)]
    pub calm: f64,
    #[serde(rename = "Stressed", default)]
    pub stressed: f64,
}

impl EmotionProbabilities {
    pub fn new(amused: f64, calm: f64, stressed: f64) -> Self {
        Self {
            amused,
            calm,
            stressed,
        }
    }

    /// Uniform distribution over all labels.
    pub fn uniform() -> Self {
        let p = 1.0 / Emotion::COUNT as f64;
        Self::new(p, p, p)
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Amused => self.amused,
            Emotion::Calm => self.calm,
            Emotion::Stressed => self.stressed,
        }
    }

    pub fn set(&mut self, emotion: Emotion, probability: f64) {
        match emotion {
            Emotion::Amused => self.amused = probability,
            Emotion::Calm => self.calm = probability,
            Emotion::Stressed => self.stressed = probability,
        }
    }

    /// Iterate `(label, probability)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    pub fn sum(&self) -> f64 {
        self.amused + self.calm + self.stressed
    }

    /// Label with the highest probability and that probability.
    ///
    /// Ties resolve to the earliest label in canonical order. NaN entries never win.
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = (Emotion::ALL[0], f64::NEG_INFINITY);
        for (emotion, p) in self.iter() {
            if p > best.1 {
                best = (emotion, p);
            }
        }
        if best.1.is_finite() {
            best
        } else {
            (Emotion::ALL[0], 0.0)
        }
    }
}

/// Output of a single classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionPrediction {
    /// Most likely label
    pub label: Emotion,
    /// Probability of `label`
    pub confidence: f64,
    /// Softmax-calibrated distribution over all labels
    pub probabilities: EmotionProbabilities,
}

/// A prediction that passed the confidence gate, stamped with when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    #[serde(flatten)]
    pub prediction: EmotionPrediction,
    pub timestamp: DateTime<Utc>,
}

impl EmotionResult {
    pub fn label(&self) -> Emotion {
        self.prediction.label
    }

    pub fn confidence(&self) -> f64 {
        self.prediction.confidence
    }

    pub fn probabilities(&self) -> &EmotionProbabilities {
        &self.prediction.probabilities
    }
}

/// Fused wellness score for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Wellness impact score (0-100)
    pub score: f64,
    pub dominant_emotion: Emotion,
    pub emotion_probabilities: EmotionProbabilities,
    pub hr: f64,
    pub hrv: f64,
    pub timestamp: DateTime<Utc>,
    /// Probability of the dominant emotion
    pub confidence: f64,
    /// 1.0 when HR is physiologically plausible, 0.5 otherwise
    pub data_quality: f64,
}

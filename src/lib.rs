//! Synheart Emotion Engine - on-device emotion inference from heart signals.
//!
//! This library turns a stream of short-interval physiological samples (heart
//! rate, heart-rate variability, motion) into a discrete emotional-state
//! classification with calibrated probabilities, and fuses that with HRV into
//! a 0-100 wellness impact score.
//!
//! # Guarantees
//!
//! - **Bounded memory**: the sample buffer is capped; old samples are evicted
//! - **Always a number**: malformed models fall back to embedded weights,
//!   degenerate windows produce well-defined features, no NaN reaches output
//! - **On-device**: no inference step performs I/O
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Synheart Emotion Engine                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  push  ┌──────────────┐   ┌──────────┐             │
//! │  │  Source  │───────▶│ EmotionEngine│──▶│ Features │             │
//! │  │ (HR/HRV) │        │ (FIFO buffer)│   │ (6 dims) │             │
//! │  └──────────┘        └──────────────┘   └────┬─────┘             │
//! │                             ▲                ▼                   │
//! │                             │         ┌────────────┐             │
//! │                   consume_ready()     │ Classifier │             │
//! │                             │         │ (softmax)  │             │
//! │                      ┌──────┴─────┐   └────────────┘             │
//! │                      │ScoreEngine │                              │
//! │                      │  (0-100)   │                              │
//! │                      └────────────┘                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use synheart_emotion_engine::{EmotionEngine, ScoreEngine};
//! use chrono::Utc;
//!
//! let engine = EmotionEngine::with_defaults();
//! let scorer = ScoreEngine::default();
//!
//! for _ in 0..20 {
//!     engine.push(72.0, 45.0, Utc::now(), 0.0);
//! }
//!
//! for result in engine.consume_ready() {
//!     let score = scorer.compute_score(72.0, 45.0, 0.0, result.probabilities());
//!     assert!((0.0..=100.0).contains(&score.score));
//! }
//! ```

pub mod config;
pub mod consent;
pub mod core;
pub mod session;
pub mod source;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use consent::{Capability, ConsentError, ConsentLevel, ConsentManager};
pub use crate::core::{
    extract_features, EmotionEngine, Emotion, EmotionPrediction, EmotionProbabilities,
    EmotionResult, EngineConfig, FeatureExtractor, FeatureVector, LinearClassifier, ModelArtifact,
    ModelError, Sample, ScoreConfig, ScoreEngine, ScoreResult,
};
pub use session::{SessionError, SessionRecord, SessionStore};
pub use source::{ReplaySource, SampleSource, SourceError, SyntheticProfile, SyntheticSource};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║         SYNHEART EMOTION ENGINE - PRIVACY DECLARATION            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This engine estimates emotional state from heart signals.       ║
║                                                                  ║
║  ✓ WHAT WE PROCESS:                                              ║
║    • Heart rate and heart-rate variability readings              ║
║    • A motion magnitude (no location, no direction)              ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Send readings or results off this device                    ║
║    • Keep more than the last few minutes of samples              ║
║    • Store raw readings in session records                       ║
║                                                                  ║
║  Processing requires 'biometric' consent, which you can          ║
║  revoke at any time with:                                        ║
║    synheart-emotion consent revoke                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

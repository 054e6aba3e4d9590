//! Streaming emotion engine.
//!
//! Samples are appended to a bounded FIFO buffer. Once enough samples are
//! present, every push runs one extraction + classification pass over the most
//! recent window and queues the result if it clears the confidence gate.
//! Consumers drain the queue with [`EmotionEngine::consume_ready`], typically
//! once per tick.
//!
//! Buffer and pending queue live behind one mutex so that ingest, drain and
//! reset can be called from different threads without ever observing a
//! half-evicted buffer.

use crate::core::classifier::LinearClassifier;
use crate::core::features::FeatureExtractor;
use crate::core::types::{EmotionResult, Sample};
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Buffering and gating parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of most recent samples fed to feature extraction
    pub window_size: usize,
    /// Samples required before any processing happens
    pub min_buffer_size: usize,
    /// Hard cap on buffered samples
    pub max_buffer_size: usize,
    /// Results below this confidence are dropped
    pub confidence_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            min_buffer_size: 10,
            max_buffer_size: 300,
            confidence_threshold: 0.6,
        }
    }
}

impl EngineConfig {
    /// Return a copy with sizes and threshold forced into a consistent range.
    pub fn sanitized(&self) -> Self {
        // The window may exceed the cap; passes then read the whole buffer.
        let window_size = self.window_size.max(1);
        let max_buffer_size = self.max_buffer_size.max(1);
        let min_buffer_size = self.min_buffer_size.clamp(1, max_buffer_size);
        let confidence_threshold = if self.confidence_threshold.is_nan() {
            Self::default().confidence_threshold
        } else {
            self.confidence_threshold.clamp(0.0, 1.0)
        };

        Self {
            window_size,
            min_buffer_size,
            max_buffer_size,
            confidence_threshold,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    buffer: VecDeque<Sample>,
    pending: Vec<EmotionResult>,
}

/// Bounded streaming pipeline from samples to gated emotion results.
#[derive(Debug)]
pub struct EmotionEngine {
    config: EngineConfig,
    extractor: FeatureExtractor,
    classifier: LinearClassifier,
    state: Mutex<EngineState>,
    log: Option<SharedTransparencyLog>,
}

impl EmotionEngine {
    pub fn new(config: EngineConfig, classifier: LinearClassifier) -> Self {
        let config = config.sanitized();
        Self {
            state: Mutex::new(EngineState {
                buffer: VecDeque::with_capacity(config.max_buffer_size + 1),
                pending: Vec::new(),
            }),
            config,
            extractor: FeatureExtractor::new(),
            classifier,
            log: None,
        }
    }

    /// Engine with default configuration and the embedded model.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), LinearClassifier::default())
    }

    /// Record ingest and gating statistics into a shared transparency log.
    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }

    /// Ingest one reading.
    pub fn push(&self, hr: f64, hrv: f64, timestamp: DateTime<Utc>, motion: f64) {
        self.push_sample(Sample::new(hr, hrv, timestamp, motion));
    }

    pub fn push_sample(&self, sample: Sample) {
        let mut state = self.lock();

        state.buffer.push_back(sample);
        if let Some(log) = &self.log {
            log.record_sample();
        }

        if state.buffer.len() >= self.config.min_buffer_size {
            self.process(&mut state);
        }

        while state.buffer.len() > self.config.max_buffer_size {
            state.buffer.pop_front();
        }
    }

    /// Take every result queued since the last call.
    pub fn consume_ready(&self) -> Vec<EmotionResult> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Drop all buffered samples and pending results.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.buffer.clear();
        state.pending.clear();
        drop(state);

        if let Some(log) = &self.log {
            log.record_clear();
        }
        tracing::info!("Emotion engine cleared");
    }

    /// Number of samples currently buffered.
    pub fn buffer_len(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Number of results waiting to be consumed.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// One extraction + classification pass over the newest window.
    fn process(&self, state: &mut EngineState) {
        let len = state.buffer.len();
        let start = len - self.config.window_size.min(len);
        let window = &state.buffer.make_contiguous()[start..];

        let features = self.extractor.extract(window);
        let prediction = self.classifier.predict(&features);

        if let Some(log) = &self.log {
            log.record_pass();
        }

        if prediction.confidence >= self.config.confidence_threshold {
            tracing::debug!(
                label = %prediction.label,
                confidence = prediction.confidence,
                window = window.len(),
                "Emotion result queued"
            );
            state.pending.push(EmotionResult {
                prediction,
                timestamp: Utc::now(),
            });
            if let Some(log) = &self.log {
                log.record_result_emitted();
            }
        } else {
            tracing::trace!(
                label = %prediction.label,
                confidence = prediction.confidence,
                threshold = self.config.confidence_threshold,
                "Emotion result below confidence gate"
            );
            if let Some(log) = &self.log {
                log.record_result_gated();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // State is consistent after every critical section, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EmotionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

//! Replay of recorded samples from a JSON-lines file.
//!
//! Each non-empty line is one sample:
//!
//! ```text
//! {"hr": 72.0, "hrv": 45.0, "timestamp": "2024-01-22T10:00:00Z", "motion": 0.1}
//! ```
//!
//! `motion` is optional. Lines starting with `#` are ignored.

use crate::core::types::Sample;
use crate::source::{interval_for_rate, spawn_producer, SampleSource, SourceError, CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Parse JSON-lines content into samples, reporting the first bad line.
pub fn parse_samples(content: &str) -> Result<Vec<Sample>, SourceError> {
    let mut samples = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample: Sample =
            serde_json::from_str(line).map_err(|e| SourceError::InvalidSample {
                line: i + 1,
                message: e.to_string(),
            })?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Background source replaying a recorded file at a fixed rate.
pub struct ReplaySource {
    path: PathBuf,
    rate_hz: f64,
    sender: Option<Sender<Sample>>,
    receiver: Receiver<Sample>,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    /// `rate_hz <= 0` replays as fast as the consumer drains.
    pub fn new(path: &Path, rate_hz: f64) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            path: path.to_path_buf(),
            rate_hz,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let samples = parse_samples(&content)?;
        let sender = self.sender.take().ok_or(SourceError::Exhausted)?;

        tracing::info!(
            path = %self.path.display(),
            samples = samples.len(),
            "Replaying recorded samples"
        );

        self.running.store(true, Ordering::SeqCst);
        spawn_producer(
            samples.into_iter(),
            interval_for_rate(self.rate_hz),
            sender,
            self.running.clone(),
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<Sample> {
        &self.receiver
    }
}

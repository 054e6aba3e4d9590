//! Deterministic synthetic biosignal generator.
//!
//! Produces periodic HR/HRV traces around a profile-specific baseline, with an
//! alternating beat-to-beat HRV offset. Useful for demos and for exercising
//! the pipeline without a wearable.

use crate::core::types::Sample;
use crate::source::{interval_for_rate, spawn_producer, SampleSource, SourceError, CHANNEL_CAPACITY};
use chrono::{Duration as ChronoDuration, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Physiological pattern to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticProfile {
    /// Low HR, high and steady HRV
    Calm,
    /// Elevated HR with moderate variability
    Amused,
    /// High HR, suppressed HRV
    Stressed,
}

impl SyntheticProfile {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "calm" => Some(Self::Calm),
            "amused" => Some(Self::Amused),
            "stressed" => Some(Self::Stressed),
            _ => None,
        }
    }

    fn parameters(&self) -> ProfileParams {
        match self {
            Self::Calm => ProfileParams {
                hr_base: 60.0,
                hr_swing: 2.0,
                hrv_base: 75.0,
                hrv_swing: 4.0,
                hrv_jitter: 20.0,
                motion: 0.05,
            },
            Self::Amused => ProfileParams {
                hr_base: 80.0,
                hr_swing: 6.0,
                hrv_base: 55.0,
                hrv_swing: 4.0,
                hrv_jitter: 15.0,
                motion: 0.4,
            },
            Self::Stressed => ProfileParams {
                hr_base: 108.0,
                hr_swing: 5.0,
                hrv_base: 20.0,
                hrv_swing: 2.0,
                hrv_jitter: 5.0,
                motion: 0.2,
            },
        }
    }
}

struct ProfileParams {
    hr_base: f64,
    hr_swing: f64,
    hrv_base: f64,
    hrv_swing: f64,
    /// Alternating beat-to-beat offset; sets RMSSD without moving the mean
    hrv_jitter: f64,
    motion: f64,
}

/// Generate `count` samples one second apart.
pub fn generate(profile: SyntheticProfile, count: usize) -> Vec<Sample> {
    SampleIter::new(profile).take(count).collect()
}

struct SampleIter {
    profile: SyntheticProfile,
    index: u64,
    start: chrono::DateTime<Utc>,
}

impl SampleIter {
    fn new(profile: SyntheticProfile) -> Self {
        Self {
            profile,
            index: 0,
            start: Utc::now(),
        }
    }
}

impl Iterator for SampleIter {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let p = self.profile.parameters();
        let t = self.index as f64;
        let jitter = if self.index % 2 == 0 {
            p.hrv_jitter
        } else {
            -p.hrv_jitter
        };

        // Respiratory-like 10 s cycle on HR, slower 30 s drift on HRV
        let hr = p.hr_base + p.hr_swing * (TAU * t / 10.0).sin();
        let hrv = p.hrv_base + p.hrv_swing * (TAU * t / 30.0).cos() + jitter;
        let timestamp = self.start + ChronoDuration::seconds(self.index as i64);

        self.index += 1;
        Some(Sample::new(hr, hrv, timestamp, p.motion))
    }
}

/// Background source emitting synthetic samples at a fixed rate.
pub struct SyntheticSource {
    profile: SyntheticProfile,
    rate_hz: f64,
    limit: Option<usize>,
    sender: Option<Sender<Sample>>,
    receiver: Receiver<Sample>,
    running: Arc<AtomicBool>,
}

impl SyntheticSource {
    /// `limit` caps the number of samples; `None` runs until stopped.
    pub fn new(profile: SyntheticProfile, rate_hz: f64, limit: Option<usize>) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            profile,
            rate_hz,
            limit,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn profile(&self) -> SyntheticProfile {
        self.profile
    }
}

impl SampleSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        // The sender moves into the producer thread; one run per source.
        let sender = self.sender.take().ok_or(SourceError::Exhausted)?;
        self.running.store(true, Ordering::SeqCst);

        let samples = SampleIter::new(self.profile);
        let interval = interval_for_rate(self.rate_hz);
        let running = self.running.clone();
        match self.limit {
            Some(limit) => spawn_producer(samples.take(limit), interval, sender, running),
            None => spawn_producer(samples, interval, sender, running),
        };
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::extract_features;

    #[test]
    fn test_profiles_are_distinct() {
        let calm = extract_features(&generate(SyntheticProfile::Calm, 60));
        let stressed = extract_features(&generate(SyntheticProfile::Stressed, 60));
        assert!(calm.mean_hr() < stressed.mean_hr());
        assert!(calm.sdnn() > stressed.sdnn());
    }

    #[test]
    fn test_limited_source_exhausts() {
        let mut source = SyntheticSource::new(SyntheticProfile::Amused, 0.0, Some(25));
        source.start().unwrap();

        let received: Vec<Sample> = source.receiver().iter().collect();
        assert_eq!(received.len(), 25);
        assert!(received.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut source = SyntheticSource::new(SyntheticProfile::Calm, 0.0, Some(1));
        source.start().unwrap();
        assert!(source.start().is_err());
    }

    #[test]
    fn test_parse_profile() {
        assert_eq!(SyntheticProfile::parse("Stressed"), Some(SyntheticProfile::Stressed));
        assert_eq!(SyntheticProfile::parse("bored"), None);
    }
}

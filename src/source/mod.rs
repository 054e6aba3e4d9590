//! Sample sources feeding the engine.
//!
//! A source runs a producer thread and hands samples to the consumer over a
//! bounded channel. Platform health-data integrations plug in here; the crate
//! ships a deterministic synthetic generator and a JSON-lines replayer.

pub mod replay;
pub mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::{SyntheticProfile, SyntheticSource};

use crate::core::types::Sample;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

/// Capacity of the producer-to-consumer channel.
pub const CHANNEL_CAPACITY: usize = 1_024;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source is already running")]
    AlreadyRunning,
    #[error("Source has been exhausted")]
    Exhausted,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid sample on line {line}: {message}")]
    InvalidSample { line: usize, message: String },
}

/// A producer of physiological samples.
pub trait SampleSource {
    /// Short name used in session records.
    fn name(&self) -> &str;

    /// Begin producing samples on a background thread.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop producing. Already-queued samples remain readable.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Channel the samples arrive on. Disconnects once the source is exhausted.
    fn receiver(&self) -> &Receiver<Sample>;
}

/// Send samples at a fixed rate until exhausted, stopped, or the receiver goes away.
///
/// A zero interval sends as fast as the channel accepts.
pub(crate) fn spawn_producer<I>(
    samples: I,
    interval: Duration,
    sender: Sender<Sample>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    I: Iterator<Item = Sample> + Send + 'static,
{
    std::thread::spawn(move || {
        for sample in samples {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if sender.send(sample).is_err() {
                break;
            }
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        running.store(false, Ordering::SeqCst);
    })
}

/// Interval between samples for a rate in Hz; zero or negative means unthrottled.
pub(crate) fn interval_for_rate(rate_hz: f64) -> Duration {
    if rate_hz > 0.0 && rate_hz.is_finite() {
        Duration::from_secs_f64(1.0 / rate_hz)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_for_rate() {
        assert_eq!(interval_for_rate(1.0), Duration::from_secs(1));
        assert_eq!(interval_for_rate(4.0), Duration::from_millis(250));
        assert_eq!(interval_for_rate(0.0), Duration::ZERO);
        assert_eq!(interval_for_rate(f64::INFINITY), Duration::ZERO);
    }
}

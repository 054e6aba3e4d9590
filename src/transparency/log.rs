//! Pipeline transparency log.
//!
//! Counts what the engine has ingested and produced without retaining any
//! physiological values, so users can audit processing at a glance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing counters for the current run.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Samples pushed into the engine
    samples_ingested: AtomicU64,
    /// Extraction + classification passes
    passes_run: AtomicU64,
    /// Results that cleared the confidence gate
    results_emitted: AtomicU64,
    /// Results dropped by the confidence gate
    results_gated: AtomicU64,
    /// Wellness scores computed
    scores_computed: AtomicU64,
    /// Buffer resets
    clears: AtomicU64,
    /// When this log was created
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            samples_ingested: AtomicU64::new(0),
            passes_run: AtomicU64::new(0),
            results_emitted: AtomicU64::new(0),
            results_gated: AtomicU64::new(0),
            scores_computed: AtomicU64::new(0),
            clears: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads prior totals from, and saves to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_sample(&self) {
        self.samples_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass(&self) {
        self.passes_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result_emitted(&self) {
        self.results_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result_gated(&self) {
        self.results_gated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_score(&self) {
        self.scores_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            passes_run: self.passes_run.load(Ordering::Relaxed),
            results_emitted: self.results_emitted.load(Ordering::Relaxed),
            results_gated: self.results_gated.load(Ordering::Relaxed),
            scores_computed: self.scores_computed.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Fraction of passes that produced a result, or `None` before any pass.
    pub fn acceptance_rate(&self) -> Option<f64> {
        let stats = self.stats();
        if stats.passes_run == 0 {
            None
        } else {
            Some(stats.results_emitted as f64 / stats.passes_run as f64)
        }
    }

    pub fn summary(&self) -> String {
        let stats = self.stats();
        let acceptance = self
            .acceptance_rate()
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "Processing Statistics:\n\
             - Samples ingested: {}\n\
             - Classification passes: {}\n\
             - Results emitted: {}\n\
             - Results below confidence gate: {}\n\
             - Acceptance rate: {}\n\
             - Scores computed: {}\n\
             - Buffer clears: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - All inference runs on this device\n\
             - Raw samples are discarded once they leave the window\n\
             - Only counts are recorded here, never readings",
            stats.samples_ingested,
            stats.passes_run,
            stats.results_emitted,
            stats.results_gated,
            acceptance,
            stats.scores_computed,
            stats.clears,
            stats.session_duration_secs
        )
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_ingested: stats.samples_ingested,
                passes_run: stats.passes_run,
                results_emitted: stats.results_emitted,
                results_gated: stats.results_gated,
                scores_computed: stats.scores_computed,
                clears: stats.clears,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_ingested
                    .store(persisted.samples_ingested, Ordering::Relaxed);
                self.passes_run.store(persisted.passes_run, Ordering::Relaxed);
                self.results_emitted
                    .store(persisted.results_emitted, Ordering::Relaxed);
                self.results_gated
                    .store(persisted.results_gated, Ordering::Relaxed);
                self.scores_computed
                    .store(persisted.scores_computed, Ordering::Relaxed);
                self.clears.store(persisted.clears, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.samples_ingested.store(0, Ordering::Relaxed);
        self.passes_run.store(0, Ordering::Relaxed);
        self.results_emitted.store(0, Ordering::Relaxed);
        self.results_gated.store(0, Ordering::Relaxed);
        self.scores_computed.store(0, Ordering::Relaxed);
        self.clears.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub samples_ingested: u64,
    pub passes_run: u64,
    pub results_emitted: u64,
    pub results_gated: u64,
    pub scores_computed: u64,
    pub clears: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_ingested: u64,
    passes_run: u64,
    results_emitted: u64,
    results_gated: u64,
    #[serde(default)]
    scores_computed: u64,
    #[serde(default)]
    clears: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

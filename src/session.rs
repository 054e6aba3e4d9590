//! Session bookkeeping.
//!
//! A session spans one run of the engine against one sample source. Records
//! hold only aggregate counters and the last score, never samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),
    #[error("Session {0} has already ended")]
    AlreadyEnded(Uuid),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Aggregate record of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Name of the sample source (e.g. "synthetic", "replay")
    pub source: String,
    pub samples: u64,
    pub results: u64,
    pub last_score: Option<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SessionRecord {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn duration_secs(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds()
    }
}

/// Keyed store of session records with optional JSON persistence.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, SessionRecord>,
    persist_path: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from `path`; a missing file means an empty store.
    pub fn with_persistence(path: PathBuf) -> Result<Self, SessionError> {
        let mut store = Self::new();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let records: Vec<SessionRecord> = serde_json::from_str(&content)?;
            store.sessions = records.into_iter().map(|r| (r.id, r)).collect();
        }
        store.persist_path = Some(path);
        Ok(store)
    }

    pub fn start(&mut self, source: &str) -> Uuid {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            source: source.to_string(),
            samples: 0,
            results: 0,
            last_score: None,
            metadata: BTreeMap::new(),
        };
        let id = record.id;
        tracing::info!(session = %id, source, "Session started");
        self.sessions.insert(id, record);
        id
    }

    pub fn stop(&mut self, id: Uuid) -> Result<&SessionRecord, SessionError> {
        let record = self.get_active_mut(id)?;
        record.ended_at = Some(Utc::now());
        tracing::info!(
            session = %id,
            samples = record.samples,
            results = record.results,
            "Session ended"
        );
        Ok(record)
    }

    pub fn record_samples(&mut self, id: Uuid, count: u64) -> Result<(), SessionError> {
        self.get_active_mut(id)?.samples += count;
        Ok(())
    }

    pub fn record_score(&mut self, id: Uuid, score: f64) -> Result<(), SessionError> {
        let record = self.get_active_mut(id)?;
        record.results += 1;
        record.last_score = Some(score);
        Ok(())
    }

    pub fn set_metadata(&mut self, id: Uuid, key: &str, value: &str) -> Result<(), SessionError> {
        let record = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        record.metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionRecord> {
        self.sessions.get(&id)
    }

    /// All sessions, oldest first.
    pub fn list(&self) -> Vec<&SessionRecord> {
        let mut records: Vec<&SessionRecord> = self.sessions.values().collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    pub fn remove(&mut self, id: Uuid) -> Option<SessionRecord> {
        self.sessions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn save(&self) -> Result<(), SessionError> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let records = self.list();
            std::fs::write(path, serde_json::to_string_pretty(&records)?)?;
        }
        Ok(())
    }

    fn get_active_mut(&mut self, id: Uuid) -> Result<&mut SessionRecord, SessionError> {
        let record = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if !record.is_active() {
            return Err(SessionError::AlreadyEnded(id));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut store = SessionStore::new();
        let id = store.start("synthetic");

        store.record_samples(id, 10).unwrap();
        store.record_score(id, 62.5).unwrap();
        store.record_score(id, 64.0).unwrap();

        let record = store.stop(id).unwrap();
        assert!(!record.is_active());
        assert_eq!(record.samples, 10);
        assert_eq!(record.results, 2);
        assert_eq!(record.last_score, Some(64.0));

        assert!(matches!(store.stop(id), Err(SessionError::AlreadyEnded(_))));
        assert!(matches!(
            store.record_samples(id, 1),
            Err(SessionError::AlreadyEnded(_))
        ));
    }

    #[test]
    fn test_unknown_session() {
        let mut store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.stop(id), Err(SessionError::NotFound(_))));
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_list_is_ordered() {
        let mut store = SessionStore::new();
        let first = store.start("replay");
        let second = store.start("synthetic");
        let listed: Vec<Uuid> = store.list().iter().map(|r| r.id).collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first) && listed.contains(&second));
        assert!(store.list()[0].started_at <= store.list()[1].started_at);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("synheart-emotion-sessions-{}.json", Uuid::new_v4()));

        let mut store = SessionStore::with_persistence(path.clone()).unwrap();
        let id = store.start("replay");
        store.set_metadata(id, "input", "morning.jsonl").unwrap();
        store.stop(id).unwrap();
        store.save().unwrap();

        let reloaded = SessionStore::with_persistence(path.clone()).unwrap();
        let record = reloaded.get(id).unwrap();
        assert_eq!(record.source, "replay");
        assert_eq!(record.metadata.get("input").map(String::as_str), Some("morning.jsonl"));
        assert!(!record.is_active());

        let _ = std::fs::remove_file(path);
    }
}

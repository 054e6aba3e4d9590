//! Consent gating for biosignal processing.
//!
//! Consent is a single hierarchical level. Each capability requires a minimum
//! level; higher levels imply all lower ones. Every change is appended to an
//! audit history that is persisted alongside the current level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Hierarchical consent levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentLevel {
    None,
    /// On-device inference from values the user enters
    Basic,
    /// Reading heart rate and HRV streams
    Biometric,
}

impl ConsentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentLevel::None => "none",
            ConsentLevel::Basic => "basic",
            ConsentLevel::Biometric => "biometric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(ConsentLevel::None),
            "basic" => Some(ConsentLevel::Basic),
            "biometric" => Some(ConsentLevel::Biometric),
            _ => None,
        }
    }
}

impl fmt::Display for ConsentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations gated by consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Classify or score values supplied directly
    Inference,
    /// Ingest a live or replayed biosignal stream
    BiosignalIngest,
    /// Keep session records on disk
    SessionStorage,
}

impl Capability {
    /// Every capability, lowest requirement first.
    pub const ALL: [Capability; 3] = [
        Capability::Inference,
        Capability::BiosignalIngest,
        Capability::SessionStorage,
    ];
}

impl Capability {
    pub fn required_level(&self) -> ConsentLevel {
        match self {
            Capability::Inference => ConsentLevel::Basic,
            Capability::BiosignalIngest => ConsentLevel::Biometric,
            Capability::SessionStorage => ConsentLevel::Biometric,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Inference => "inference",
            Capability::BiosignalIngest => "biosignal ingest",
            Capability::SessionStorage => "session storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("{capability} requires '{required}' consent (current: '{current}')")]
    Denied {
        capability: Capability,
        required: ConsentLevel,
        current: ConsentLevel,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry in the consent audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentEvent {
    pub timestamp: DateTime<Utc>,
    pub from: ConsentLevel,
    pub to: ConsentLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedConsent {
    level: ConsentLevel,
    history: Vec<ConsentEvent>,
}

/// Current consent level plus its audit trail.
#[derive(Debug)]
pub struct ConsentManager {
    level: ConsentLevel,
    history: Vec<ConsentEvent>,
    persist_path: Option<PathBuf>,
}

impl ConsentManager {
    /// A manager with no consent granted.
    pub fn new() -> Self {
        Self {
            level: ConsentLevel::None,
            history: Vec::new(),
            persist_path: None,
        }
    }

    /// Load persisted consent from `path`; a missing file means no consent.
    pub fn with_persistence(path: PathBuf) -> Result<Self, ConsentError> {
        let mut manager = Self::new();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let persisted: PersistedConsent = serde_json::from_str(&content)?;
            manager.level = persisted.level;
            manager.history = persisted.history;
        }
        manager.persist_path = Some(path);
        Ok(manager)
    }

    pub fn level(&self) -> ConsentLevel {
        self.level
    }

    pub fn history(&self) -> &[ConsentEvent] {
        &self.history
    }

    /// Set the consent level. No-op (and no audit entry) if unchanged.
    pub fn grant(&mut self, level: ConsentLevel) -> Result<(), ConsentError> {
        if level == self.level {
            return Ok(());
        }

        let mut history = self.history.clone();
        history.push(ConsentEvent {
            timestamp: Utc::now(),
            from: self.level,
            to: level,
        });
        let next = PersistedConsent { level, history };

        // Nothing changes in memory unless the new state reached disk.
        self.write(&next)?;
        tracing::info!(from = %self.level, to = %level, "Consent level changed");
        self.level = next.level;
        self.history = next.history;
        Ok(())
    }

    /// Withdraw all consent.
    pub fn revoke(&mut self) -> Result<(), ConsentError> {
        self.grant(ConsentLevel::None)
    }

    pub fn is_allowed(&self, capability: Capability) -> bool {
        self.level >= capability.required_level()
    }

    pub fn check(&self, capability: Capability) -> Result<(), ConsentError> {
        if self.is_allowed(capability) {
            Ok(())
        } else {
            Err(ConsentError::Denied {
                capability,
                required: capability.required_level(),
                current: self.level,
            })
        }
    }

    fn write(&self, state: &PersistedConsent) -> Result<(), ConsentError> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(state)?)?;
        }
        Ok(())
    }
}

impl Default for ConsentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denies_everything() {
        let manager = ConsentManager::new();
        assert!(!manager.is_allowed(Capability::Inference));
        assert!(matches!(
            manager.check(Capability::BiosignalIngest),
            Err(ConsentError::Denied {
                required: ConsentLevel::Biometric,
                current: ConsentLevel::None,
                ..
            })
        ));
    }

    #[test]
    fn test_levels_are_hierarchical() {
        let mut manager = ConsentManager::new();
        manager.grant(ConsentLevel::Biometric).unwrap();
        assert!(manager.is_allowed(Capability::Inference));
        assert!(manager.is_allowed(Capability::BiosignalIngest));
        assert!(manager.is_allowed(Capability::SessionStorage));

        manager.grant(ConsentLevel::Basic).unwrap();
        assert!(manager.is_allowed(Capability::Inference));
        assert!(!manager.is_allowed(Capability::BiosignalIngest));
    }

    #[test]
    fn test_history_records_changes_only() {
        let mut manager = ConsentManager::new();
        manager.grant(ConsentLevel::Basic).unwrap();
        manager.grant(ConsentLevel::Basic).unwrap();
        manager.grant(ConsentLevel::Biometric).unwrap();
        manager.revoke().unwrap();

        let history = manager.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].from, ConsentLevel::None);
        assert_eq!(history[1].to, ConsentLevel::Biometric);
        assert_eq!(history[2].to, ConsentLevel::None);
        assert_eq!(manager.level(), ConsentLevel::None);
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(ConsentLevel::parse("Biometric"), Some(ConsentLevel::Biometric));
        assert_eq!(ConsentLevel::parse(" basic "), Some(ConsentLevel::Basic));
        assert_eq!(ConsentLevel::parse("research"), None);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("synheart-emotion-consent-{}.json", uuid::Uuid::new_v4()));

        let mut manager = ConsentManager::with_persistence(path.clone()).unwrap();
        manager.grant(ConsentLevel::Biometric).unwrap();

        let reloaded = ConsentManager::with_persistence(path.clone()).unwrap();
        assert_eq!(reloaded.level(), ConsentLevel::Biometric);
        assert_eq!(reloaded.history().len(), 1);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        // A regular file where the parent directory should be makes every write fail
        let blocker = std::env::temp_dir()
            .join(format!("synheart-emotion-consent-blocker-{}", uuid::Uuid::new_v4()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut manager = ConsentManager::with_persistence(blocker.join("consent.json")).unwrap();
        assert!(manager.grant(ConsentLevel::Biometric).is_err());
        assert_eq!(manager.level(), ConsentLevel::None);
        assert!(manager.history().is_empty());
        assert!(!manager.is_allowed(Capability::BiosignalIngest));

        let _ = std::fs::remove_file(blocker);
    }
}

//! Generic usage statistics, the fourth persisted store

use crate::storage::JsonDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    pub total_sessions: u32,
    pub total_tasks_decomposed: u32,
    pub total_tasks_completed: u32,
    /// Rolling mean of estimated/actual over completed tasks
    pub average_efficiency: f64,
    /// subject → completed tasks
    pub subjects_worked: BTreeMap<String, u32>,
    pub best_hours: Vec<u8>,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            total_tasks_decomposed: 0,
            total_tasks_completed: 0,
            average_efficiency: 1.0,
            subjects_worked: BTreeMap::new(),
            best_hours: Vec::new(),
        }
    }
}

pub struct StatsStore {
    document: JsonDocument,
    stats: UsageStats,
}

impl StatsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path);
        let stats = document.load();
        Self { document, stats }
    }

    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    pub fn save(&self) -> crate::error::Result<()> {
        self.document.save(&self.stats)
    }

    fn persist(&self) {
        self.document.persist(&self.stats);
    }

    pub fn record_session(&mut self) {
        self.stats.total_sessions += 1;
        self.persist();
    }

    pub fn record_decomposition(&mut self) {
        self.stats.total_tasks_decomposed += 1;
        self.persist();
    }

    pub fn record_completion(&mut self, subject: &str, efficiency: f64) {
        let done = self.stats.total_tasks_completed as f64;
        self.stats.average_efficiency =
            (self.stats.average_efficiency * done + efficiency) / (done + 1.0);
        self.stats.total_tasks_completed += 1;
        *self
            .stats
            .subjects_worked
            .entry(subject.to_string())
            .or_default() += 1;

        debug!(
            "Completion recorded for {} (average efficiency {:.2})",
            subject, self.stats.average_efficiency
        );
        self.persist();
    }

    pub fn set_best_hours(&mut self, hours: Vec<u8>) {
        self.stats.best_hours = hours;
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_counters_and_rolling_efficiency() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let mut store = StatsStore::open(&path);

        store.record_session();
        store.record_decomposition();
        store.record_completion("maths", 0.5);
        store.record_completion("maths", 1.5);
        store.record_completion("histoire", 1.0);
        store.set_best_hours(vec![9, 14]);

        let stats = store.stats();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_tasks_decomposed, 1);
        assert_eq!(stats.total_tasks_completed, 3);
        assert!((stats.average_efficiency - 1.0).abs() < 1e-9);
        assert_eq!(stats.subjects_worked.get("maths"), Some(&2));

        let reloaded = StatsStore::open(&path);
        assert_eq!(reloaded.stats(), store.stats());
    }

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let store = StatsStore::open(dir.path().join("absent.json"));
        assert_eq!(store.stats(), &UsageStats::default());
    }
}

//! Knowledge memory: learned content gaps per subject and topic
//!
//! The store is a two-level map `subject → topic → TopicEntry`. Each entry
//! remembers which element kinds users keep reporting as missing and how
//! often the topic was flagged. Priority is always re-derived from the flag
//! count, so it can never drift from it:
//!
//! | times_flagged | priority |
//! |---------------|----------|
//! | >= 3          | high     |
//! | 2             | medium   |
//! | <= 1          | low      |
//!
//! Topics at medium priority or above have their gaps injected automatically
//! into future answers. Entries only ever lose weight through [`KnowledgeMemory::decay`],
//! which an external scheduler is expected to call periodically.

use crate::error::Result;
use crate::storage::JsonDocument;
use crate::types::{ElementKind, Priority};
use crate::utils::time::deserialize_lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Topic key used when the caller gives none
pub const GENERAL_TOPIC: &str = "general";

/// Gap record for one subject/topic pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    #[serde(default, deserialize_with = "deserialize_known_kinds")]
    pub missing_often: BTreeSet<ElementKind>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub times_flagged: u32,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for TopicEntry {
    fn default() -> Self {
        Self {
            missing_often: BTreeSet::new(),
            priority: Priority::Low,
            times_flagged: 0,
            last_updated: None,
        }
    }
}

impl TopicEntry {
    fn refresh_priority(&mut self) {
        self.priority = Priority::from_times_flagged(self.times_flagged);
    }
}

fn default_priority() -> Priority {
    Priority::Low
}

/// Older documents may carry kinds this build does not know; drop them
/// instead of rejecting the whole memory.
fn deserialize_known_kinds<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<ElementKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|s| s.parse().ok()).collect())
}

/// Persisted layout: subject → topic → entry
pub type KnowledgeMap = BTreeMap<String, BTreeMap<String, TopicEntry>>;

/// Topic surfaced by [`KnowledgeMemory::priority_elements`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityTopic {
    pub topic: String,
    pub missing_often: Vec<ElementKind>,
    pub priority: Priority,
    pub times_flagged: u32,
}

/// Summary returned by [`KnowledgeMemory::statistics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStatistics {
    pub total_subjects: usize,
    pub total_topics: usize,
    /// Up to five most frequent gap kinds across all topics
    pub most_common_missing: Vec<(ElementKind, usize)>,
    pub high_priority_topics: usize,
}

/// Trimmed and lower-cased, with spaces and hyphens turned into underscores;
/// empty → "general".
pub fn normalize_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return GENERAL_TOPIC.to_string();
    }
    trimmed.to_lowercase().replace([' ', '-'], "_")
}

fn topic_key(topic: Option<&str>) -> String {
    topic.map(normalize_key).unwrap_or_else(|| GENERAL_TOPIC.to_string())
}

/// Persistent gap memory
pub struct KnowledgeMemory {
    document: JsonDocument,
    map: KnowledgeMap,
}

impl KnowledgeMemory {
    /// Load the memory from `path` (defaults when missing or corrupt).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path);
        let mut map: KnowledgeMap = document.load();

        // Priority is derived data; never trust the stored value
        for entry in map.values_mut().flat_map(|topics| topics.values_mut()) {
            entry.refresh_priority();
        }

        debug!(
            "Knowledge memory loaded from {} ({} subjects)",
            document.path().display(),
            map.len()
        );
        Self { document, map }
    }

    /// Read-only view of the whole map
    pub fn entries(&self) -> &KnowledgeMap {
        &self.map
    }

    /// Persist explicitly, surfacing storage errors
    pub fn save(&self) -> Result<()> {
        self.document.save(&self.map)
    }

    fn persist(&self) {
        self.document.persist(&self.map);
    }

    // ------------------------------------------------------------------
    // Recording gaps
    // ------------------------------------------------------------------

    /// Flag `kind` as missing for a subject/topic. An empty subject is ignored.
    pub fn record_missing(&mut self, subject: &str, topic: Option<&str>, kind: ElementKind) {
        self.record_missing_at(subject, topic, kind, Utc::now());
    }

    /// [`Self::record_missing`] with an explicit clock
    pub fn record_missing_at(
        &mut self,
        subject: &str,
        topic: Option<&str>,
        kind: ElementKind,
        now: DateTime<Utc>,
    ) {
        if subject.trim().is_empty() {
            debug!("Ignoring gap {} without subject", kind);
            return;
        }

        let subject = normalize_key(subject);
        let topic = topic_key(topic);

        let entry = self
            .map
            .entry(subject.clone())
            .or_default()
            .entry(topic.clone())
            .or_default();

        entry.missing_often.insert(kind);
        entry.times_flagged += 1;
        entry.refresh_priority();
        entry.last_updated = Some(now);

        info!(
            "Recorded missing {} for {}/{} (flagged {} times, {} priority)",
            kind, subject, topic, entry.times_flagged, entry.priority
        );

        self.persist();
    }

    /// Flag several kinds; each one is applied and persisted on its own.
    pub fn record_multiple_missing(
        &mut self,
        subject: &str,
        topic: Option<&str>,
        kinds: &[ElementKind],
    ) {
        for kind in kinds {
            self.record_missing(subject, topic, *kind);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Entry for one topic (`None` topic means "general").
    pub fn topic_info(&self, subject: &str, topic: Option<&str>) -> Option<&TopicEntry> {
        self.map
            .get(&normalize_key(subject))
            .and_then(|topics| topics.get(&topic_key(topic)))
    }

    /// Gap set for one topic, or the union over all topics of the subject
    /// when `topic` is `None`.
    pub fn missing_elements(&self, subject: &str, topic: Option<&str>) -> BTreeSet<ElementKind> {
        let Some(topics) = self.map.get(&normalize_key(subject)) else {
            return BTreeSet::new();
        };

        match topic {
            Some(topic) => topics
                .get(&normalize_key(topic))
                .map(|entry| entry.missing_often.clone())
                .unwrap_or_default(),
            None => topics
                .values()
                .flat_map(|entry| entry.missing_often.iter().copied())
                .collect(),
        }
    }

    /// Topics at or above `min_priority`, high priority first.
    pub fn priority_elements(&self, subject: &str, min_priority: Priority) -> Vec<PriorityTopic> {
        let Some(topics) = self.map.get(&normalize_key(subject)) else {
            return Vec::new();
        };

        let mut results: Vec<PriorityTopic> = topics
            .iter()
            .filter(|(_, entry)| entry.priority >= min_priority)
            .map(|(topic, entry)| PriorityTopic {
                topic: topic.clone(),
                missing_often: entry.missing_often.iter().copied().collect(),
                priority: entry.priority,
                times_flagged: entry.times_flagged,
            })
            .collect();

        results.sort_by_key(|t| t.priority.rank());
        results
    }

    /// True iff `kind` is a known gap of the topic and the topic is at least
    /// medium priority.
    pub fn should_inject(&self, subject: &str, topic: Option<&str>, kind: ElementKind) -> bool {
        self.topic_info(subject, topic)
            .map(|entry| entry.priority.is_actionable() && entry.missing_often.contains(&kind))
            .unwrap_or(false)
    }

    /// Every gap of the topic when it is at least medium priority, else nothing.
    pub fn injection_list(&self, subject: &str, topic: Option<&str>) -> Vec<ElementKind> {
        match self.topic_info(subject, topic) {
            Some(entry) if entry.priority.is_actionable() => {
                entry.missing_often.iter().copied().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Aggregate counts over the whole memory
    pub fn statistics(&self) -> MemoryStatistics {
        let mut kind_counts: BTreeMap<ElementKind, usize> = BTreeMap::new();
        let mut total_topics = 0;
        let mut high_priority_topics = 0;

        for entry in self.map.values().flat_map(|topics| topics.values()) {
            total_topics += 1;
            if entry.priority == Priority::High {
                high_priority_topics += 1;
            }
            for kind in &entry.missing_often {
                *kind_counts.entry(*kind).or_default() += 1;
            }
        }

        let mut most_common_missing: Vec<(ElementKind, usize)> = kind_counts.into_iter().collect();
        most_common_missing.sort_by(|a, b| b.1.cmp(&a.1));
        most_common_missing.truncate(5);

        MemoryStatistics {
            total_subjects: self.map.len(),
            total_topics,
            most_common_missing,
            high_priority_topics,
        }
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Remove one flag (floor 1) from every entry last updated more than
    /// `days_threshold` days ago. Returns how many entries were touched.
    pub fn decay(&mut self, days_threshold: i64) -> usize {
        self.decay_at(Utc::now(), days_threshold)
    }

    /// [`Self::decay`] with an explicit clock
    pub fn decay_at(&mut self, now: DateTime<Utc>, days_threshold: i64) -> usize {
        let mut decayed = 0;

        for entry in self.map.values_mut().flat_map(|topics| topics.values_mut()) {
            let Some(last_updated) = entry.last_updated else {
                continue;
            };
            if (now - last_updated).num_days() > days_threshold {
                entry.times_flagged = entry.times_flagged.saturating_sub(1).max(1);
                entry.refresh_priority();
                decayed += 1;
            }
        }

        info!(
            "Decayed {} knowledge entries older than {} days",
            decayed, days_threshold
        );
        self.persist();
        decayed
    }

    /// Forget one topic. Returns whether it existed.
    pub fn clear_topic(&mut self, subject: &str, topic: &str) -> bool {
        let subject = normalize_key(subject);
        let topic = normalize_key(topic);

        let removed = self
            .map
            .get_mut(&subject)
            .and_then(|topics| topics.remove(&topic))
            .is_some();

        if removed {
            info!("Cleared knowledge topic {}/{}", subject, topic);
            self.persist();
        }
        removed
    }

    /// Forget every topic of a subject. Returns whether it existed.
    pub fn clear_subject(&mut self, subject: &str) -> bool {
        let subject = normalize_key(subject);
        let removed = self.map.remove(&subject).is_some();

        if removed {
            info!("Cleared knowledge subject {}", subject);
            self.persist();
        }
        removed
    }

    /// Drop everything
    pub fn reset(&mut self) {
        self.map.clear();
        info!("Knowledge memory reset");
        self.persist();
    }
}

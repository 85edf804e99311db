//! Local content providers
//!
//! A provider answers `static_data(task, level)` with whatever fixed
//! pedagogical material it has for its subject. Providers are registered per
//! subject in a [`ContentRegistry`]; unknown subjects fall back to a provider
//! that returns an empty bundle. Providers never fail.

use crate::error::{FocuspathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateEvent {
    pub date: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formula {
    pub name: String,
    pub formula: String,
    pub usage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Figure {
    pub name: String,
    pub role: String,
    pub period: String,
}

/// Material returned by a content provider; every list may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticContent {
    pub definitions: Vec<Definition>,
    pub formulas: Vec<Formula>,
    pub dates: Vec<DateEvent>,
    pub figures: Vec<Figure>,
    pub methodology: Vec<String>,
    pub common_mistakes: Vec<String>,
}

impl StaticContent {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
            && self.formulas.is_empty()
            && self.dates.is_empty()
            && self.figures.is_empty()
            && self.methodology.is_empty()
            && self.common_mistakes.is_empty()
    }

    /// Append every list of `other`
    fn extend(&mut self, other: &StaticContent) {
        self.definitions.extend(other.definitions.iter().cloned());
        self.formulas.extend(other.formulas.iter().cloned());
        self.dates.extend(other.dates.iter().cloned());
        self.figures.extend(other.figures.iter().cloned());
        self.methodology.extend(other.methodology.iter().cloned());
        self.common_mistakes.extend(other.common_mistakes.iter().cloned());
    }
}

/// Source of fixed pedagogical material for one subject
pub trait ContentProvider: Send + Sync {
    /// Material relevant to `task` at school `level`
    fn static_data(&self, task: &str, level: &str) -> StaticContent;

    /// Name reported in decision bundles
    fn name(&self) -> &str;
}

/// Provider returning the same bundle for every task
#[derive(Debug, Clone)]
pub struct FixedContentProvider {
    name: String,
    content: StaticContent,
}

impl FixedContentProvider {
    pub fn new(name: impl Into<String>, content: StaticContent) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, StaticContent::default())
    }
}

impl ContentProvider for FixedContentProvider {
    fn static_data(&self, _task: &str, _level: &str) -> StaticContent {
        self.content.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Topic section of a content table, selected when every keyword occurs in
/// the lower-cased task text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicContent {
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub content: StaticContent,
}

/// On-disk content table: material always served plus keyword topics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTable {
    #[serde(flatten)]
    pub always: StaticContent,
    #[serde(default)]
    pub topics: Vec<TopicContent>,
}

/// Provider backed by a [`ContentTable`]; the first matching topic wins.
#[derive(Debug, Clone)]
pub struct TableContentProvider {
    name: String,
    table: ContentTable,
}

impl TableContentProvider {
    pub fn new(name: impl Into<String>, table: ContentTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// Read a `.json` or `.toml` table
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let table: ContentTable = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|e| {
                FocuspathError::ValidationError(format!("{}: {}", path.display(), e))
            })?,
            _ => serde_json::from_str(&raw)?,
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table")
            .to_string();
        Ok(Self::new(name, table))
    }
}

impl ContentProvider for TableContentProvider {
    fn static_data(&self, task: &str, _level: &str) -> StaticContent {
        let task = task.to_lowercase();
        let mut content = self.table.always.clone();

        let topic = self.table.topics.iter().find(|topic| {
            !topic.keywords.is_empty()
                && topic
                    .keywords
                    .iter()
                    .all(|kw| task.contains(&kw.to_lowercase()))
        });
        if let Some(topic) = topic {
            debug!("Content table {} matched {:?}", self.name, topic.keywords);
            content.extend(&topic.content);
        }

        content
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Subject → provider map, populated once at startup
#[derive(Clone)]
pub struct ContentRegistry {
    providers: HashMap<String, Arc<dyn ContentProvider>>,
    fallback: Arc<dyn ContentProvider>,
}

impl Default for ContentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            fallback: Arc::new(FixedContentProvider::empty("generic")),
        }
    }

    pub fn register(&mut self, subject: &str, provider: Arc<dyn ContentProvider>) {
        self.providers.insert(subject.trim().to_lowercase(), provider);
    }

    pub fn with_provider(mut self, subject: &str, provider: Arc<dyn ContentProvider>) -> Self {
        self.register(subject, provider);
        self
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Provider for `subject`, or the empty fallback
    pub fn provider_for(&self, subject: &str) -> Arc<dyn ContentProvider> {
        self.providers
            .get(&subject.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Register one table provider per `<subject>.json` / `<subject>.toml`
    /// file in `dir`. Unreadable tables are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let supported = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("toml")
            );
            if !supported {
                continue;
            }

            match TableContentProvider::from_file(&path) {
                Ok(provider) => {
                    let subject = provider.name().to_string();
                    registry.register(&subject, Arc::new(provider));
                }
                Err(e) => warn!("Skipping content table {}: {}", path.display(), e),
            }
        }

        info!(
            "Loaded {} content tables from {}",
            registry.providers.len(),
            dir.display()
        );
        Ok(registry)
    }
}

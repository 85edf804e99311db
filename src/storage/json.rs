//! Whole-document JSON persistence
//!
//! Loading never fails: a missing file yields defaults, and an unreadable or
//! corrupt file is logged and also yields defaults. Saving creates the parent
//! directory when needed and replaces the target through a temp file + rename.

use super::merge_over_defaults;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A single persisted JSON document
#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document, overlaying stored values on `T::default()`.
    pub fn load<T>(&self) -> T
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match self.try_load() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!("No document at {}, using defaults", self.path.display());
                T::default()
            }
            Err(e) => {
                warn!(
                    "Failed to load {}: {}; falling back to defaults",
                    self.path.display(),
                    e
                );
                T::default()
            }
        }
    }

    /// Load, surfacing I/O and parse errors. `Ok(None)` when the file is absent.
    pub fn try_load<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let loaded: serde_json::Value = serde_json::from_str(&raw)?;
        let defaults = serde_json::to_value(T::default())?;
        let merged = merge_over_defaults(defaults, loaded);

        Ok(Some(serde_json::from_value(merged)?))
    }

    /// Overwrite the document with `value`.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Saved {}", self.path.display());
        Ok(())
    }

    /// Save, logging instead of returning the error.
    ///
    /// Stores call this after every mutation so a full disk or a read-only
    /// directory degrades to in-memory operation.
    pub fn persist<T: Serialize>(&self, value: &T) -> bool {
        match self.save(value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Delete the stored document, if any.
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        level: u8,
        label: String,
        counts: BTreeMap<String, u32>,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                level: 3,
                label: "default".to_string(),
                counts: BTreeMap::new(),
            }
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let doc = JsonDocument::new(dir.path().join("absent.json"));
        assert_eq!(doc.load::<Sample>(), Sample::default());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ this is not json").unwrap();

        let doc = JsonDocument::new(&path);
        assert_eq!(doc.load::<Sample>(), Sample::default());
        assert!(doc.try_load::<Sample>().is_err());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let doc = JsonDocument::new(dir.path().join("nested").join("deeper").join("doc.json"));

        let mut sample = Sample::default();
        sample.level = 5;
        sample.counts.insert("maths".to_string(), 2);
        doc.save(&sample).unwrap();

        assert!(doc.exists());
        assert_eq!(doc.load::<Sample>(), sample);
        assert!(!doc.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_partial_document_is_overlaid_on_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, r#"{"level": 1}"#).unwrap();

        let loaded: Sample = JsonDocument::new(&path).load();
        assert_eq!(loaded.level, 1);
        assert_eq!(loaded.label, "default");
    }

    #[test]
    fn test_persist_reports_failure_without_error() {
        let dir = TempDir::new().unwrap();
        // A file where the parent directory should be makes create_dir_all fail
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let doc = JsonDocument::new(blocker.join("doc.json"));

        assert!(!doc.persist(&Sample::default()));
    }
}

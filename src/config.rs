//! Layered configuration for Focuspath
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`, else `<config dir>/focuspath.toml`)
//! 3. Environment variables prefixed `FOCUSPATH__` (e.g. `FOCUSPATH__WEB__API_KEY`)
//!
//! The Perplexity key is additionally picked up from `PERPLEXITY_API_KEY`
//! when nothing else set it.

use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PROFILE_FILE: &str = "user_profile.json";
pub const KNOWLEDGE_MEMORY_FILE: &str = "knowledge_memory.json";
pub const FEEDBACK_FILE: &str = "feedback.json";
pub const STATS_FILE: &str = "stats.json";
pub const WEB_USAGE_FILE: &str = "web_usage_log.json";

const CONFIG_FILE: &str = "focuspath.toml";
const ENV_PREFIX: &str = "FOCUSPATH";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocuspathConfig {
    pub paths: PathsConfig,
    pub web: WebConfig,
    pub feedback: FeedbackConfig,
    pub memory: MemoryConfig,
}

/// Where persisted documents live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    /// Optional directory of `<subject>.json` / `<subject>.toml` content tables
    pub content_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            content_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn profile_file(&self) -> PathBuf {
        self.data_dir.join(PROFILE_FILE)
    }

    pub fn knowledge_memory_file(&self) -> PathBuf {
        self.data_dir.join(KNOWLEDGE_MEMORY_FILE)
    }

    pub fn feedback_file(&self) -> PathBuf {
        self.data_dir.join(FEEDBACK_FILE)
    }

    pub fn stats_file(&self) -> PathBuf {
        self.data_dir.join(STATS_FILE)
    }

    pub fn web_usage_file(&self) -> PathBuf {
        self.data_dir.join(WEB_USAGE_FILE)
    }
}

/// Web search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Perplexity API key (empty = web search unavailable)
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Attempts on transient failures (429, timeouts)
    pub max_retries: usize,
    /// First backoff delay; doubled after each failed attempt
    pub backoff_base_ms: u64,
    /// Daily request quota enforced by the web guard
    pub max_daily_requests: u32,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "llama-3.1-sonar-small-128k-online".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 1000,
            max_daily_requests: 50,
        }
    }
}

/// Feedback history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Cap applied to each feedback history
    pub max_history: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self { max_history: 200 }
    }
}

/// Knowledge memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Entries untouched for longer than this lose one flag on decay
    pub decay_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { decay_days: 30 }
    }
}

impl FocuspathConfig {
    /// Load configuration from defaults, an optional TOML file, and the
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(default_config_file);

        // Every section is #[serde(default)], so absent keys keep built-in values
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let mut loaded: FocuspathConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        if loaded.web.api_key.is_empty() {
            if let Ok(key) = env::var("PERPLEXITY_API_KEY") {
                loaded.web.api_key = key;
            }
        }

        Ok(loaded)
    }

    /// Defaults rooted at an explicit data directory (tests, `--data-dir`)
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.paths.data_dir = data_dir.into();
        config
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "focuspath", "focuspath")
}

/// Platform data directory, falling back to `./data`
pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

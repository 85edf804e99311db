//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use focuspath_core::{
    error::{FocuspathError, Result},
    services::{
        ContentRegistry, DateEvent, Definition, FixedContentProvider, StaticContent,
        WebEnrichment, WebSearchProvider,
    },
    Companion, DecisionEngine, DecisionRules, FocuspathConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Configuration rooted in a fresh temporary directory, no web key
pub fn test_config(dir: &TempDir) -> FocuspathConfig {
    let mut config = FocuspathConfig::with_data_dir(dir.path());
    config.web.api_key.clear();
    config
}

pub fn definition(term: &str, text: &str) -> Definition {
    Definition {
        term: term.to_string(),
        definition: text.to_string(),
    }
}

pub fn date(date: &str, event: &str) -> DateEvent {
    DateEvent {
        date: date.to_string(),
        event: event.to_string(),
    }
}

/// History tables used by the workflow tests
pub fn history_registry() -> ContentRegistry {
    let content = StaticContent {
        definitions: vec![definition("Armistice", "Fin des combats")],
        dates: vec![date("1918", "Armistice")],
        methodology: vec!["Situer dans le temps".to_string()],
        ..Default::default()
    };
    ContentRegistry::new().with_provider(
        "histoire",
        Arc::new(FixedContentProvider::new("histoire", content)),
    )
}

/// Web search fake returning a fixed enrichment, counting calls
pub struct FakeWeb {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeWeb {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for FakeWeb {
    async fn enrich_topic(
        &self,
        _task: &str,
        _subject: &str,
        _topic: Option<&str>,
    ) -> Result<WebEnrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FocuspathError::Timeout("fake web".to_string()));
        }
        Ok(WebEnrichment {
            success: true,
            dates: vec![date("1918", "doublon"), date("1914", "Début de la guerre")],
            facts: vec!["Environ 10 millions de morts militaires".to_string()],
            ..Default::default()
        })
    }

    fn source_name(&self) -> &str {
        "fake"
    }
}

/// Companion over `dir` with the history tables and the given web provider
pub fn companion_with_web(dir: &TempDir, web: Arc<FakeWeb>, max_daily: u32) -> Companion {
    let mut config = test_config(dir);
    config.web.max_daily_requests = max_daily;
    let engine = DecisionEngine::new(DecisionRules::default(), history_registry())
        .with_web_provider(web);
    Companion::open_with_engine(config, engine).unwrap()
}

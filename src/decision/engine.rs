//! Source arbitration and response orchestration

use super::fusion::{fuse, FusedBundle};
use super::rules::DecisionRules;
use crate::memory::KnowledgeMemory;
use crate::personalization::UserPersonalization;
use crate::services::{ConsentGuard, ContentRegistry, StaticContent, WebEnrichment, WebSearchProvider};
use crate::types::{DataSource, ElementKind, Priority, DEFAULT_LEVEL};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on a whole web enrichment call, retries included
pub const DEFAULT_WEB_DEADLINE: Duration = Duration::from_secs(120);

/// Usage-log source for web attempts made without a provider
pub const UNCONFIGURED_SOURCE: &str = "unconfigured";

pub const WEB_SUGGESTION_MESSAGE: &str =
    "Souhaites-tu activer la recherche web pour enrichir la réponse ?";

/// One task to answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionContext {
    pub task_text: String,
    pub subject: String,
    pub topic: Option<String>,
    /// School level handed to the content provider
    pub level: Option<String>,
    pub force_web: bool,
    pub force_offline: bool,
}

impl DecisionContext {
    pub fn new(task_text: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            task_text: task_text.into(),
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// Learner state consulted by a decision, borrowed for its duration
#[derive(Clone, Copy)]
pub struct LearnerState<'a> {
    pub profile: &'a UserPersonalization,
    pub memory: Option<&'a KnowledgeMemory>,
}

/// What the local content provider returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalBundle {
    pub provider: String,
    #[serde(flatten)]
    pub content: StaticContent,
}

/// What the knowledge memory knows about the task's topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryBundle {
    pub missing_often: Vec<ElementKind>,
    /// Only filled when a topic was given and it is at least medium priority
    pub should_inject: Vec<ElementKind>,
    pub priority: Priority,
    pub times_flagged: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub chosen_source: DataSource,
    pub reasons: Vec<String>,
    pub local_bundle: LocalBundle,
    pub memory_bundle: Option<MemoryBundle>,
    pub web_bundle: Option<WebEnrichment>,
    pub fused_bundle: FusedBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSuggestion {
    pub suggest_web: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Chooses where content comes from and fuses the results
pub struct DecisionEngine {
    rules: DecisionRules,
    content: ContentRegistry,
    web: Option<Arc<dyn WebSearchProvider>>,
    guard: Option<Arc<dyn ConsentGuard>>,
    web_deadline: Duration,
}

impl DecisionEngine {
    pub fn new(rules: DecisionRules, content: ContentRegistry) -> Self {
        Self {
            rules,
            content,
            web: None,
            guard: None,
            web_deadline: DEFAULT_WEB_DEADLINE,
        }
    }

    pub fn with_web_provider(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web = Some(provider);
        self
    }

    pub fn with_consent_guard(mut self, guard: Arc<dyn ConsentGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_web_deadline(mut self, deadline: Duration) -> Self {
        self.web_deadline = deadline;
        self
    }

    pub fn has_web_provider(&self) -> bool {
        self.web.is_some()
    }

    pub fn rules(&self) -> &DecisionRules {
        &self.rules
    }

    pub fn requires_factual_data(&self, task: &str, subject: &str) -> bool {
        self.rules.requires_factual_data(task, subject)
    }

    /// User consent, then the guard's own check when one is attached
    pub fn web_allowed(&self, profile: &UserPersonalization) -> bool {
        profile.web_enabled() && self.guard.as_ref().map_or(true, |g| g.can_use_web())
    }

    fn has_memory_gaps(&self, ctx: &DecisionContext, memory: Option<&KnowledgeMemory>) -> bool {
        memory
            .map(|m| !m.missing_elements(&ctx.subject, ctx.topic.as_deref()).is_empty())
            .unwrap_or(false)
    }

    /// First matching rule wins:
    /// offline forced, web forced, factual data needed, known gaps, local.
    pub fn decide_source(
        &self,
        ctx: &DecisionContext,
        learner: LearnerState<'_>,
    ) -> (DataSource, Vec<String>) {
        let mut reasons = Vec::new();

        if ctx.force_offline {
            reasons.push("offline forced".to_string());
            return (DataSource::Local, reasons);
        }

        let web_allowed = self.web_allowed(learner.profile);

        if ctx.force_web && web_allowed {
            reasons.push("web forced by user".to_string());
            return (DataSource::Web, reasons);
        }

        if web_allowed && self.requires_factual_data(&ctx.task_text, &ctx.subject) {
            reasons.push("factual data required".to_string());
            reasons.push("web allowed".to_string());
            return (DataSource::Web, reasons);
        }

        if self.has_memory_gaps(ctx, learner.memory) {
            reasons.push("known gaps in knowledge memory".to_string());
            return (DataSource::Memory, reasons);
        }

        reasons.push("local content tables".to_string());
        (DataSource::Local, reasons)
    }

    fn local_bundle(&self, ctx: &DecisionContext) -> LocalBundle {
        let provider = self.content.provider_for(&ctx.subject);
        let level = ctx.level.as_deref().unwrap_or(DEFAULT_LEVEL);
        LocalBundle {
            provider: provider.name().to_string(),
            content: provider.static_data(&ctx.task_text, level),
        }
    }

    fn memory_bundle(ctx: &DecisionContext, memory: &KnowledgeMemory) -> MemoryBundle {
        let topic = ctx.topic.as_deref();
        let missing_often = memory
            .missing_elements(&ctx.subject, topic)
            .into_iter()
            .collect();

        let (should_inject, priority, times_flagged) = match topic {
            Some(topic) => {
                let info = memory.topic_info(&ctx.subject, Some(topic));
                (
                    memory.injection_list(&ctx.subject, Some(topic)),
                    info.map(|e| e.priority).unwrap_or(Priority::Low),
                    info.map(|e| e.times_flagged).unwrap_or(0),
                )
            }
            None => (Vec::new(), Priority::Low, 0),
        };

        MemoryBundle {
            missing_often,
            should_inject,
            priority,
            times_flagged,
        }
    }

    /// Call the web provider within the deadline. Never fails: every error
    /// becomes an unsuccessful enrichment.
    async fn fetch_web(&self, ctx: &DecisionContext) -> WebEnrichment {
        let (source, enrichment) = match self.web.as_ref() {
            Some(provider) => (provider.source_name(), self.call_provider(provider.as_ref(), ctx).await),
            None => {
                warn!("Web enrichment requested but no web search provider is configured");
                (
                    UNCONFIGURED_SOURCE,
                    WebEnrichment::failure("no web search provider configured"),
                )
            }
        };

        if let Some(guard) = &self.guard {
            guard.record_usage(source, "enrich", Some(&ctx.subject), enrichment.success);
        }
        enrichment
    }

    async fn call_provider(&self, provider: &dyn WebSearchProvider, ctx: &DecisionContext) -> WebEnrichment {
        let call = provider.enrich_topic(&ctx.task_text, &ctx.subject, ctx.topic.as_deref());
        match tokio::time::timeout(self.web_deadline, call).await {
            Ok(Ok(enrichment)) => enrichment,
            Ok(Err(e)) => {
                warn!("Web enrichment failed: {}", e);
                WebEnrichment::failure(e.to_string())
            }
            Err(_) => {
                warn!("Web enrichment timed out after {:?}", self.web_deadline);
                WebEnrichment::failure(format!("timed out after {:?}", self.web_deadline))
            }
        }
    }

    /// Decide, gather every relevant bundle and fuse them.
    pub async fn orchestrate_response(
        &self,
        ctx: &DecisionContext,
        learner: LearnerState<'_>,
    ) -> DecisionResult {
        let (chosen_source, reasons) = self.decide_source(ctx, learner);
        info!(
            "Source for '{}' ({}): {} [{}]",
            crate::utils::preview(&ctx.task_text, 40),
            ctx.subject,
            chosen_source,
            reasons.join(", ")
        );

        let local_bundle = self.local_bundle(ctx);
        let memory_bundle = learner.memory.map(|m| Self::memory_bundle(ctx, m));
        let web_bundle = if chosen_source == DataSource::Web {
            Some(self.fetch_web(ctx).await)
        } else {
            None
        };

        let to_inject = memory_bundle
            .as_ref()
            .map(|m| m.should_inject.as_slice())
            .unwrap_or(&[]);
        let fused_bundle = fuse(&local_bundle.content, web_bundle.as_ref(), to_inject);

        debug!(
            "Fused bundle: {} definitions, {} dates, {} to inject",
            fused_bundle.definitions.len(),
            fused_bundle.dates.len(),
            fused_bundle.elements_to_inject.len()
        );

        DecisionResult {
            chosen_source,
            reasons,
            local_bundle,
            memory_bundle,
            web_bundle,
            fused_bundle,
        }
    }

    /// Suggest enabling the web when the task needs facts it cannot get now
    pub fn suggest_web_usage(
        &self,
        task: &str,
        subject: &str,
        profile: &UserPersonalization,
    ) -> WebSuggestion {
        if self.requires_factual_data(task, subject) && !self.web_allowed(profile) {
            WebSuggestion {
                suggest_web: true,
                reason: format!(
                    "Cette tâche ({}) pourrait bénéficier de données actualisées du web.",
                    subject
                ),
                message: Some(WEB_SUGGESTION_MESSAGE),
            }
        } else {
            WebSuggestion {
                suggest_web: false,
                reason: "Les données locales sont suffisantes.".to_string(),
                message: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FocuspathError, Result};
    use crate::services::{Definition, FixedContentProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeWeb {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WebSearchProvider for FakeWeb {
        async fn enrich_topic(&self, _task: &str, _subject: &str, _topic: Option<&str>) -> Result<WebEnrichment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FocuspathError::NetworkError("connection refused".to_string()));
            }
            Ok(WebEnrichment {
                success: true,
                definitions: vec![
                    Definition { term: "Tiers État".to_string(), definition: "web".to_string() },
                    Definition { term: "Jacobins".to_string(), definition: "web".to_string() },
                ],
                ..Default::default()
            })
        }
    }

    struct Quota(bool);

    impl ConsentGuard for Quota {
        fn can_use_web(&self) -> bool {
            self.0
        }
    }

    fn local_registry() -> ContentRegistry {
        let content = StaticContent {
            definitions: vec![Definition {
                term: "Tiers État".to_string(),
                definition: "local".to_string(),
            }],
            ..Default::default()
        };
        ContentRegistry::new().with_provider("histoire", Arc::new(FixedContentProvider::new("histoire", content)))
    }

    fn stores(dir: &TempDir, web_enabled: bool) -> (UserPersonalization, KnowledgeMemory) {
        let mut profile = UserPersonalization::open(dir.path().join("profile.json"));
        profile.set_web_enabled(web_enabled);
        let memory = KnowledgeMemory::open(dir.path().join("memory.json"));
        (profile, memory)
    }

    #[test]
    fn test_force_offline_always_wins() {
        let dir = TempDir::new().unwrap();
        let (profile, mut memory) = stores(&dir, true);
        memory.record_missing("histoire", Some("ww1"), ElementKind::Dates);

        let engine = DecisionEngine::new(DecisionRules::default(), local_registry());
        let mut ctx = DecisionContext::new("Quelle est la date de l'armistice ?", "histoire").with_topic("ww1");
        ctx.force_offline = true;
        ctx.force_web = true;

        let learner = LearnerState { profile: &profile, memory: Some(&memory) };
        let (source, reasons) = engine.decide_source(&ctx, learner);
        assert_eq!(source, DataSource::Local);
        assert_eq!(reasons, vec!["offline forced".to_string()]);
    }

    #[test]
    fn test_force_web_needs_consent() {
        let dir = TempDir::new().unwrap();
        let (profile, _) = stores(&dir, false);
        let engine = DecisionEngine::new(DecisionRules::default(), local_registry());
        let mut ctx = DecisionContext::new("Faire une fiche", "maths");
        ctx.force_web = true;

        let learner = LearnerState { profile: &profile, memory: None };
        assert_eq!(engine.decide_source(&ctx, learner).0, DataSource::Local);
    }

    #[test]
    fn test_factual_task_goes_to_web_only_when_allowed() {
        let dir = TempDir::new().unwrap();
        let (profile, _) = stores(&dir, true);
        let ctx = DecisionContext::new("En quelle année a eu lieu la bataille de Verdun", "histoire");

        let open = DecisionEngine::new(DecisionRules::default(), local_registry());
        let learner = LearnerState { profile: &profile, memory: None };
        assert_eq!(open.decide_source(&ctx, learner).0, DataSource::Web);

        let over_quota = DecisionEngine::new(DecisionRules::default(), local_registry())
            .with_consent_guard(Arc::new(Quota(false)));
        assert_eq!(over_quota.decide_source(&ctx, learner).0, DataSource::Local);
    }

    #[test]
    fn test_memory_gaps_select_memory() {
        let dir = TempDir::new().unwrap();
        let (profile, mut memory) = stores(&dir, false);
        memory.record_missing("maths", Some("derivees"), ElementKind::Formulas);

        let engine = DecisionEngine::new(DecisionRules::default(), local_registry());
        let ctx = DecisionContext::new("Faire les exercices", "maths").with_topic("derivees");
        let learner = LearnerState { profile: &profile, memory: Some(&memory) };
        assert_eq!(engine.decide_source(&ctx, learner).0, DataSource::Memory);

        let other = DecisionContext::new("Faire les exercices", "maths").with_topic("integrales");
        assert_eq!(engine.decide_source(&other, learner).0, DataSource::Local);
    }

    #[tokio::test]
    async fn test_orchestrate_merges_web_and_memory() {
        let dir = TempDir::new().unwrap();
        let (profile, mut memory) = stores(&dir, true);
        memory.record_missing("histoire", Some("revolution"), ElementKind::Figures);
        memory.record_missing("histoire", Some("revolution"), ElementKind::Figures);

        let web = Arc::new(FakeWeb { calls: AtomicUsize::new(0), fail: false });
        let engine = DecisionEngine::new(DecisionRules::default(), local_registry())
            .with_web_provider(web.clone());
        let ctx = DecisionContext::new("Quand a eu lieu la Révolution ?", "histoire").with_topic("revolution");

        let learner = LearnerState { profile: &profile, memory: Some(&memory) };
        let result = engine.orchestrate_response(&ctx, learner).await;

        assert_eq!(result.chosen_source, DataSource::Web);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.local_bundle.provider, "histoire");

        let terms: Vec<&str> = result.fused_bundle.definitions.iter().map(|d| d.term.as_str()).collect();
        assert_eq!(terms, vec!["Tiers État", "Jacobins"]);
        assert_eq!(result.fused_bundle.definitions[0].definition, "local");

        let memory_bundle = result.memory_bundle.unwrap();
        assert_eq!(memory_bundle.priority, Priority::Medium);
        assert_eq!(memory_bundle.times_flagged, 2);
        assert_eq!(result.fused_bundle.elements_to_inject, vec![ElementKind::Figures]);
    }

    #[tokio::test]
    async fn test_web_failure_degrades_to_local() {
        let dir = TempDir::new().unwrap();
        let (profile, _) = stores(&dir, true);

        let engine = DecisionEngine::new(DecisionRules::default(), local_registry())
            .with_web_provider(Arc::new(FakeWeb { calls: AtomicUsize::new(0), fail: true }));
        let ctx = DecisionContext::new("Qui a écrit Candide ?", "histoire");
        let learner = LearnerState { profile: &profile, memory: None };
        let result = engine.orchestrate_response(&ctx, learner).await;

        assert_eq!(result.chosen_source, DataSource::Web);
        let web = result.web_bundle.unwrap();
        assert!(!web.success);
        assert!(web.error.unwrap().contains("connection refused"));
        assert_eq!(result.fused_bundle.definitions.len(), 1);
        assert!(result.memory_bundle.is_none());
    }

    #[tokio::test]
    async fn test_missing_provider_is_a_failed_enrichment() {
        let dir = TempDir::new().unwrap();
        let (profile, _) = stores(&dir, true);
        let engine = DecisionEngine::new(DecisionRules::default(), local_registry());
        let mut ctx = DecisionContext::new("Réviser", "histoire");
        ctx.force_web = true;

        let learner = LearnerState { profile: &profile, memory: None };
        let result = engine.orchestrate_response(&ctx, learner).await;
        assert!(!result.web_bundle.unwrap().success);
    }

    #[test]
    fn test_suggest_web_usage() {
        let dir = TempDir::new().unwrap();
        let (profile, _) = stores(&dir, false);
        let engine = DecisionEngine::new(DecisionRules::default(), local_registry());

        let suggestion = engine.suggest_web_usage("Quelle est la date du traité ?", "histoire", &profile);
        assert!(suggestion.suggest_web);
        assert_eq!(suggestion.message, Some(WEB_SUGGESTION_MESSAGE));

        assert!(!engine.suggest_web_usage("Faire une fiche", "maths", &profile).suggest_web);
    }
}

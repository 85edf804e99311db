//! Study companion facade
//!
//! Owns every persisted store, the web guard and the decision engine, and
//! exposes the few workflows callers actually need: plan a task, complete
//! it, critique an answer, review adaptations. Each workflow updates all
//! the stores it touches so callers never have to keep them in sync.

use crate::config::FocuspathConfig;
use crate::decision::{
    DecisionContext, DecisionEngine, DecisionResult, DecisionRules, LearnerState, WebSuggestion,
};
use crate::error::Result;
use crate::feedback::engine::efficiency;
use crate::feedback::{
    AdaptationSuggestion, FeedbackEngine, ParsedFeedback, PedagogicalFeedbackParser,
    SuggestionKind,
};
use crate::memory::KnowledgeMemory;
use crate::personalization::UserPersonalization;
use crate::services::web_search::backoff_delay;
use crate::services::{ContentRegistry, PerplexityClient, WebGuard};
use crate::stats::StatsStore;
use crate::types::{Difficulty, DurationVerdict};
use chrono::{Local, Timelike};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Best hours mirrored into the stats document
const BEST_HOURS_TRACKED: usize = 3;

/// A finished task as reported by the learner
#[derive(Debug, Clone)]
pub struct CompletedTask {
    /// Generated when absent
    pub task_id: Option<String>,
    pub subject: String,
    /// Duration history bucket, usually the task type
    pub category: String,
    pub difficulty: Difficulty,
    pub estimated_minutes: u32,
    pub actual_minutes: u32,
    /// Explicit verdict from the form; derived from the ratio otherwise
    pub verdict: Option<DurationVerdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub task_id: String,
    pub verdict: DurationVerdict,
    pub efficiency: f64,
    pub total_tasks_completed: u32,
    pub streak_days: u32,
    /// What the next task of the same category would now be estimated at
    pub next_estimate_minutes: u32,
}

/// Overall deadline for one web enrichment: the first attempt and every
/// retry at full timeout, plus every backoff pause.
fn web_deadline(config: &FocuspathConfig) -> Duration {
    let web = &config.web;
    let attempts = (web.max_retries as u64).saturating_add(1);
    let backoff = (0..web.max_retries).fold(Duration::ZERO, |total, retry| {
        total.saturating_add(backoff_delay(web.backoff_base_ms, retry))
    });
    Duration::from_secs(web.timeout_secs.saturating_mul(attempts)).saturating_add(backoff)
}

fn content_registry(config: &FocuspathConfig) -> Result<ContentRegistry> {
    match &config.paths.content_dir {
        Some(dir) => ContentRegistry::load_dir(dir),
        None => Ok(ContentRegistry::new()),
    }
}

pub struct Companion {
    config: FocuspathConfig,
    profile: UserPersonalization,
    memory: KnowledgeMemory,
    feedback: FeedbackEngine,
    parser: PedagogicalFeedbackParser,
    stats: StatsStore,
    guard: Arc<WebGuard>,
    engine: DecisionEngine,
}

impl Companion {
    /// Load every store from the configured data directory and assemble the
    /// decision engine. The web client is only attached when an API key is
    /// configured.
    pub fn open(config: FocuspathConfig) -> Result<Self> {
        let engine = DecisionEngine::new(DecisionRules::default(), content_registry(&config)?)
            .with_web_deadline(web_deadline(&config));
        Self::open_with_engine(config, engine)
    }

    /// Like [`Companion::open`] but with a caller-built engine (custom
    /// content providers, another web search provider). The web guard is
    /// always attached; the configured web client only when the engine has
    /// no provider yet.
    pub fn open_with_engine(config: FocuspathConfig, engine: DecisionEngine) -> Result<Self> {
        let paths = &config.paths;
        info!("Opening study data in {}", paths.data_dir.display());

        let guard = Arc::new(WebGuard::open(
            paths.web_usage_file(),
            config.web.max_daily_requests,
        ));

        let mut engine = engine.with_consent_guard(guard.clone());
        if !engine.has_web_provider() {
            match PerplexityClient::new(&config.web) {
                Ok(client) if client.is_available() => {
                    debug!("Web search provider configured");
                    engine = engine.with_web_provider(Arc::new(client));
                }
                Ok(_) => debug!("No web API key; web enrichment disabled"),
                Err(e) => warn!("Web search client unavailable: {}", e),
            }
        }

        Ok(Self {
            profile: UserPersonalization::open(paths.profile_file()),
            memory: KnowledgeMemory::open(paths.knowledge_memory_file()),
            feedback: FeedbackEngine::open(paths.feedback_file(), config.feedback.max_history),
            parser: PedagogicalFeedbackParser::new(config.feedback.max_history),
            stats: StatsStore::open(paths.stats_file()),
            guard,
            engine,
            config,
        })
    }

    pub fn config(&self) -> &FocuspathConfig {
        &self.config
    }

    pub fn profile(&self) -> &UserPersonalization {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut UserPersonalization {
        &mut self.profile
    }

    pub fn memory(&self) -> &KnowledgeMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut KnowledgeMemory {
        &mut self.memory
    }

    pub fn feedback(&self) -> &FeedbackEngine {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut FeedbackEngine {
        &mut self.feedback
    }

    pub fn parser(&self) -> &PedagogicalFeedbackParser {
        &self.parser
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn web_guard(&self) -> &WebGuard {
        &self.guard
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Count a study session and stamp the current hour. The streak is
    /// updated before the session date moves.
    pub fn start_session(&mut self) {
        self.stats.record_session();
        self.profile.update_streak();
        self.profile.update_last_session();
        self.profile.record_activity_hour(Local::now().hour() as u8);
    }

    /// Choose the content source for a task and build the fused bundle
    pub async fn plan(&mut self, ctx: &DecisionContext) -> DecisionResult {
        let learner = LearnerState {
            profile: &self.profile,
            memory: Some(&self.memory),
        };
        let result = self.engine.orchestrate_response(ctx, learner).await;
        self.stats.record_decomposition();
        result
    }

    pub fn suggest_web_usage(&self, task: &str, subject: &str) -> WebSuggestion {
        self.engine.suggest_web_usage(task, subject, &self.profile)
    }

    /// Feed a finished task into every store that learns from it
    pub fn complete_task(&mut self, task: CompletedTask) -> CompletionReport {
        let task_id = task
            .task_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let verdict = self.feedback.record_duration_feedback(
            &task_id,
            task.estimated_minutes,
            task.actual_minutes,
            task.verdict,
        );
        let efficiency = efficiency(task.estimated_minutes, task.actual_minutes);

        self.profile.record_task_duration(&task.category, task.actual_minutes);
        self.profile.update_subject_preference(&task.subject, efficiency);
        self.profile.increment_tasks_completed();
        self.profile.update_streak();
        self.profile.update_last_session();

        self.stats.record_completion(&task.subject, efficiency);
        self.stats.set_best_hours(self.profile.best_hours(BEST_HOURS_TRACKED));

        let next_estimate_minutes = self.profile.personalized_estimate(
            &task.category,
            task.difficulty,
            task.estimated_minutes,
        );

        info!(
            "Completed {} in {} min ({} estimated, {})",
            task_id, task.actual_minutes, task.estimated_minutes, verdict
        );

        CompletionReport {
            task_id,
            verdict,
            efficiency,
            total_tasks_completed: self.profile.total_tasks_completed(),
            streak_days: self.profile.streak_days(),
            next_estimate_minutes,
        }
    }

    /// Parse a critique of an answer and flag its gaps in memory
    pub fn critique(&mut self, text: &str, subject: &str, topic: Option<&str>) -> ParsedFeedback {
        self.parser
            .parse_feedback(text, Some(subject), topic, Some(&mut self.memory))
    }

    pub fn adaptations(&self) -> Vec<AdaptationSuggestion> {
        self.feedback.adaptation_suggestions(&self.profile)
    }

    /// Apply a suggestion to the profile. Only detail level suggestions
    /// carry a concrete change; returns whether anything changed.
    pub fn accept_adaptation(&mut self, suggestion: &AdaptationSuggestion) -> bool {
        match suggestion.kind {
            SuggestionKind::Spiciness { current, suggested } if current != suggested => {
                self.profile.set_preferred_spiciness(suggested as i32);
                true
            }
            _ => false,
        }
    }

    /// Change web consent and audit it
    pub fn set_web_enabled(&mut self, enabled: bool) {
        self.profile.set_web_enabled(enabled);
        self.guard.log_permission_change(enabled);
    }

    /// Run memory decay with the configured threshold
    pub fn decay_memory(&mut self) -> usize {
        self.memory.decay(self.config.memory.decay_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::engine::UNCONFIGURED_SOURCE;
    use crate::services::{FixedContentProvider, StaticContent};
    use crate::types::{DataSource, ElementKind};
    use tempfile::TempDir;

    fn companion(dir: &TempDir) -> Companion {
        Companion::open(FocuspathConfig::with_data_dir(dir.path())).unwrap()
    }

    #[test]
    fn test_web_deadline_covers_retries() {
        let mut config = FocuspathConfig::default();
        config.web.timeout_secs = 30;
        config.web.max_retries = 3;
        config.web.backoff_base_ms = 1000;
        // 4 attempts of 30s plus 1s, 2s and 4s of backoff
        assert_eq!(web_deadline(&config), Duration::from_secs(127));
    }

    #[test]
    fn test_web_deadline_survives_extreme_config() {
        let mut config = FocuspathConfig::default();
        config.web.timeout_secs = u64::MAX;
        config.web.max_retries = 70;
        config.web.backoff_base_ms = u64::MAX;
        assert_eq!(web_deadline(&config), Duration::MAX);

        config.web.timeout_secs = 1;
        config.web.backoff_base_ms = 1;
        // 71 attempts, then pauses of 1ms doubling up to the 60s cap
        let deadline = web_deadline(&config);
        assert!(deadline > Duration::from_secs(71));
        assert!(deadline <= Duration::from_secs(71 + 70 * 60));
    }

    #[test]
    fn test_complete_task_updates_every_store() {
        let dir = TempDir::new().unwrap();
        let mut companion = companion(&dir);

        let report = companion.complete_task(CompletedTask {
            task_id: None,
            subject: "maths".to_string(),
            category: "exercice".to_string(),
            difficulty: Difficulty::Medium,
            estimated_minutes: 20,
            actual_minutes: 30,
            verdict: None,
        });

        assert_eq!(report.verdict, DurationVerdict::TooShort);
        assert!(!report.task_id.is_empty());
        assert_eq!(report.total_tasks_completed, 1);
        assert_eq!(report.streak_days, 1);
        assert_eq!(companion.profile().duration_history("exercice"), vec![30]);
        assert_eq!(companion.profile().subject_preference("maths").times_worked, 1);
        assert_eq!(companion.stats().stats().total_tasks_completed, 1);
        assert_eq!(companion.feedback().data().form_feedback.duration.len(), 1);

        // Everything was persisted
        let reopened = self::companion(&dir);
        assert_eq!(reopened.profile().total_tasks_completed(), 1);
        assert_eq!(reopened.feedback().data().form_feedback.duration.len(), 1);
    }

    #[test]
    fn test_critique_flags_memory() {
        let dir = TempDir::new().unwrap();
        let mut companion = companion(&dir);

        companion.critique("Il manque des dates", "histoire", Some("ww1"));
        companion.critique("Il manque encore les dates", "histoire", Some("ww1"));

        let entry = companion.memory().topic_info("histoire", Some("ww1")).unwrap();
        assert_eq!(entry.times_flagged, 2);
        assert!(companion.memory().should_inject("histoire", Some("ww1"), ElementKind::Dates));
    }

    #[tokio::test]
    async fn test_plan_forced_offline_skips_web() {
        let dir = TempDir::new().unwrap();
        let mut companion = companion(&dir);
        companion.set_web_enabled(true);

        let mut ctx = DecisionContext::new("Quand a eu lieu l'armistice ?", "histoire");
        ctx.force_offline = true;
        let result = companion.plan(&ctx).await;

        assert_eq!(result.chosen_source, DataSource::Local);
        assert!(result.web_bundle.is_none());
        assert_eq!(companion.stats().stats().total_tasks_decomposed, 1);
        assert_eq!(companion.web_guard().usage_log().total_requests, 0);
    }

    #[tokio::test]
    async fn test_plan_without_web_key_degrades_to_local() {
        let dir = TempDir::new().unwrap();
        let mut config = FocuspathConfig::with_data_dir(dir.path());
        config.web.api_key.clear();
        let content = StaticContent {
            methodology: vec!["Situer dans le temps".to_string()],
            ..Default::default()
        };
        let registry = ContentRegistry::new()
            .with_provider("histoire", Arc::new(FixedContentProvider::new("histoire", content)));
        let engine = DecisionEngine::new(DecisionRules::default(), registry);
        let mut companion = Companion::open_with_engine(config, engine).unwrap();
        assert!(!companion.engine().has_web_provider());
        companion.set_web_enabled(true);

        let ctx = DecisionContext::new("Quand a eu lieu l'armistice ?", "histoire");
        let result = companion.plan(&ctx).await;

        assert_eq!(result.chosen_source, DataSource::Web);
        let web = result.web_bundle.as_ref().unwrap();
        assert!(!web.success);
        assert!(web.error.is_some());
        assert!(web.definitions.is_empty());

        assert_eq!(result.local_bundle.provider, "histoire");
        assert_eq!(result.fused_bundle.methodology, vec!["Situer dans le temps".to_string()]);

        let log = companion.web_guard().usage_log();
        assert_eq!(log.total_requests, 1);
        assert_eq!(log.history[0].source, UNCONFIGURED_SOURCE);
        assert!(!log.history[0].success);
        assert_eq!(log.history[0].subject.as_deref(), Some("histoire"));
    }

    #[test]
    fn test_accept_spiciness_adaptation() {
        let dir = TempDir::new().unwrap();
        let mut companion = companion(&dir);
        let suggestion = AdaptationSuggestion {
            priority: crate::types::Priority::High,
            kind: SuggestionKind::Spiciness {
                current: 3,
                suggested: 4,
            },
            reason: "test".to_string(),
        };

        assert!(companion.accept_adaptation(&suggestion));
        assert_eq!(companion.profile().preferred_spiciness(), 4);
    }
}

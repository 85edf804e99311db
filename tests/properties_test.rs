//! Property tests for the invariants the stores and the decision engine
//! must keep whatever the input.

mod common;

use chrono::{Duration, TimeZone, Utc};
use focuspath_core::{
    decision::{fuse, DecisionContext, DecisionEngine, DecisionRules, LearnerState},
    feedback::FeedbackEngine,
    personalization::estimator::{personalized_estimate, MAX_DURATION_HISTORY},
    services::{StaticContent, WebEnrichment},
    types::{DataSource, Difficulty, ElementKind, Priority},
    KnowledgeMemory, UserPersonalization,
};
use proptest::prelude::*;
use std::collections::HashSet;
use tempfile::TempDir;

fn element_kind() -> impl Strategy<Value = ElementKind> {
    prop::sample::select(ElementKind::ALL.to_vec())
}

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_priority_follows_flag_count(kinds in prop::collection::vec(element_kind(), 1..12)) {
        let dir = TempDir::new().unwrap();
        let mut memory = KnowledgeMemory::open(dir.path().join("memory.json"));
        memory.record_multiple_missing("maths", Some("suites"), &kinds);

        let entry = memory.topic_info("maths", Some("suites")).unwrap();
        prop_assert_eq!(entry.times_flagged as usize, kinds.len());
        prop_assert_eq!(entry.priority, Priority::from_times_flagged(entry.times_flagged));

        let distinct: HashSet<ElementKind> = kinds.iter().copied().collect();
        prop_assert_eq!(entry.missing_often.len(), distinct.len());
    }

    #[test]
    fn prop_decay_never_drops_below_one(flags in 1u32..8, age_days in 0i64..400) {
        let dir = TempDir::new().unwrap();
        let mut memory = KnowledgeMemory::open(dir.path().join("memory.json"));
        let then = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        for _ in 0..flags {
            memory.record_missing_at("svt", Some("cellule"), ElementKind::Definitions, then);
        }

        memory.decay_at(then + Duration::days(age_days), 30);

        let entry = memory.topic_info("svt", Some("cellule")).unwrap();
        let expected = if age_days > 30 { flags.saturating_sub(1).max(1) } else { flags };
        prop_assert_eq!(entry.times_flagged, expected);
        prop_assert!(entry.times_flagged >= 1);
        prop_assert_eq!(entry.priority, Priority::from_times_flagged(expected));
    }

    #[test]
    fn prop_profile_setters_clamp(level in -50i32..50, minutes in -500i64..500, fatigue in -3.0f64..3.0) {
        let dir = TempDir::new().unwrap();
        let mut profile = UserPersonalization::open(dir.path().join("profile.json"));

        profile.set_preferred_spiciness(level);
        profile.set_focus_duration(minutes);
        profile.set_fatigue_sensitivity(fatigue);

        prop_assert!((1..=5).contains(&profile.preferred_spiciness()));
        prop_assert!((5..=60).contains(&profile.focus_duration()));
        prop_assert!((0.0..=1.0).contains(&profile.fatigue_sensitivity()));
    }

    #[test]
    fn prop_estimate_stays_in_bounds(
        history in prop::collection::vec(0u32..300, 0..25),
        difficulty in difficulty(),
        base in 0u32..200,
        fatigue in 0.0f64..=1.0,
    ) {
        let minutes = personalized_estimate(&history, difficulty, base, fatigue);
        prop_assert!((5..=45).contains(&minutes));
    }

    #[test]
    fn prop_histories_are_bounded(durations in prop::collection::vec(1u32..120, 0..60)) {
        let dir = TempDir::new().unwrap();
        let mut profile = UserPersonalization::open(dir.path().join("profile.json"));
        let mut feedback = FeedbackEngine::open(dir.path().join("feedback.json"), 10);

        for (i, minutes) in durations.iter().enumerate() {
            profile.record_task_duration("exercice", *minutes);
            feedback.record_duration_feedback(&i.to_string(), 20, *minutes, None);
        }

        let kept = profile.duration_history("exercice");
        prop_assert_eq!(kept.len(), durations.len().min(MAX_DURATION_HISTORY));
        let skip = durations.len().saturating_sub(MAX_DURATION_HISTORY);
        prop_assert_eq!(&kept[..], &durations[skip..]);
        prop_assert_eq!(
            feedback.data().form_feedback.duration.len(),
            durations.len().min(10)
        );
    }

    #[test]
    fn prop_force_offline_always_local(
        task in "[a-zA-Zéè ?]{0,40}",
        subject in prop::sample::select(vec!["histoire", "maths", "physique", "svt"]),
        force_web in any::<bool>(),
        web_enabled in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let mut profile = UserPersonalization::open(dir.path().join("profile.json"));
        profile.set_web_enabled(web_enabled);
        let mut memory = KnowledgeMemory::open(dir.path().join("memory.json"));
        memory.record_missing(subject, None, ElementKind::Dates);

        let engine = DecisionEngine::new(DecisionRules::default(), common::history_registry());
        let mut ctx = DecisionContext::new(task, subject);
        ctx.force_offline = true;
        ctx.force_web = force_web;

        let learner = LearnerState { profile: &profile, memory: Some(&memory) };
        let (source, _) = engine.decide_source(&ctx, learner);
        prop_assert_eq!(source, DataSource::Local);
    }

    #[test]
    fn prop_fusion_keys_are_unique(
        local_terms in prop::collection::hash_set("[a-e]{1,2}", 0..6),
        web_terms in prop::collection::vec("[a-e]{1,2}", 0..10),
    ) {
        let local = StaticContent {
            definitions: local_terms.iter().map(|t| common::definition(t, "local")).collect(),
            ..Default::default()
        };
        let web = WebEnrichment {
            success: true,
            definitions: web_terms.iter().map(|t| common::definition(t, "web")).collect(),
            ..Default::default()
        };

        let fused = fuse(&local, Some(&web), &[]);
        let keys: Vec<&str> = fused.definitions.iter().map(|d| d.term.as_str()).collect();
        let unique: HashSet<&str> = keys.iter().copied().collect();
        prop_assert_eq!(keys.len(), unique.len());

        // Local items keep their place and their content
        for (got, want) in fused.definitions.iter().zip(&local.definitions) {
            prop_assert_eq!(got, want);
        }
        let expected: HashSet<&str> = local_terms
            .iter()
            .map(String::as_str)
            .chain(web_terms.iter().map(String::as_str))
            .collect();
        prop_assert_eq!(unique, expected);
    }
}

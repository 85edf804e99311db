//! Personalization profile
//!
//! One adaptive profile per user, persisted after every mutation. Setters
//! clamp out-of-range values silently instead of rejecting them:
//!
//! - detail level ("spiciness") in 1..=5
//! - focus duration in 5..=60 minutes
//! - fatigue sensitivity in 0.0..=1.0
//! - difficulty bias per subject in -1.0..=1.0

pub mod estimator;

use crate::storage::JsonDocument;
use crate::types::Difficulty;
use crate::utils::time::parse_session_date;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub use estimator::{break_activity, MAX_DURATION_HISTORY};

/// Format of `last_session`
pub const SESSION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hours suggested before any activity was recorded
pub const DEFAULT_BEST_HOURS: [u8; 3] = [9, 14, 16];

/// Damping applied by [`UserPersonalization::adjust_difficulty_bias`]
pub const BIAS_STEP: f64 = 0.1;

const DEFAULT_SUBJECTS: [&str; 5] = ["maths", "histoire", "physique", "francais", "anglais"];

/// Per-subject working record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPreference {
    pub times_worked: u32,
    #[serde(rename = "avg_efficiency")]
    pub rolling_average_efficiency: f64,
    #[serde(rename = "preferred_spiciness")]
    pub preferred_detail_level: u8,
}

/// Persisted profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub preferred_spiciness: u8,
    pub focus_duration: u32,
    pub difficulty_bias: BTreeMap<String, f64>,
    pub fatigue_sensitivity: f64,
    pub web_enabled: bool,
    /// hour of day → number of recorded activities
    pub preferred_hours: BTreeMap<u8, u32>,
    pub subject_preferences: BTreeMap<String, SubjectPreference>,
    /// category → most recent durations in minutes, oldest first
    pub duration_history: BTreeMap<String, VecDeque<u32>>,
    pub total_tasks_completed: u32,
    pub streak_days: u32,
    pub last_session: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            preferred_spiciness: 3,
            focus_duration: 20,
            difficulty_bias: DEFAULT_SUBJECTS
                .iter()
                .map(|s| (s.to_string(), 0.0))
                .collect(),
            fatigue_sensitivity: 0.5,
            web_enabled: false,
            preferred_hours: BTreeMap::new(),
            subject_preferences: BTreeMap::new(),
            duration_history: BTreeMap::new(),
            total_tasks_completed: 0,
            streak_days: 0,
            last_session: None,
        }
    }
}

impl UserProfile {
    /// Bring a loaded document back inside the documented ranges
    fn sanitize(&mut self) {
        self.preferred_spiciness = clamp_level(self.preferred_spiciness as i32);
        self.focus_duration = self.focus_duration.clamp(5, 60);
        self.fatigue_sensitivity = clamp_unit(self.fatigue_sensitivity, 0.0, 1.0, 0.5);
        for bias in self.difficulty_bias.values_mut() {
            *bias = clamp_unit(*bias, -1.0, 1.0, 0.0);
        }
        self.preferred_hours.retain(|hour, _| *hour < 24);
        for history in self.duration_history.values_mut() {
            while history.len() > MAX_DURATION_HISTORY {
                history.pop_front();
            }
        }
    }
}

fn clamp_level(level: i32) -> u8 {
    level.clamp(1, 5) as u8
}

/// Clamp, mapping NaN to `fallback`
fn clamp_unit(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Snapshot returned by [`UserPersonalization::productivity_summary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivitySummary {
    pub total_completed: u32,
    pub streak_days: u32,
    pub preferred_spiciness: u8,
    pub focus_duration: u32,
    pub best_hours: Vec<u8>,
    pub web_enabled: bool,
}

/// Adaptive user profile backed by a JSON document
pub struct UserPersonalization {
    document: JsonDocument,
    profile: UserProfile,
}

impl UserPersonalization {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path);
        let mut profile: UserProfile = document.load();
        profile.sanitize();
        debug!("Profile loaded from {}", document.path().display());
        Self { document, profile }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn save(&self) -> crate::error::Result<()> {
        self.document.save(&self.profile)
    }

    fn persist(&self) {
        self.document.persist(&self.profile);
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    pub fn preferred_spiciness(&self) -> u8 {
        self.profile.preferred_spiciness
    }

    pub fn set_preferred_spiciness(&mut self, level: i32) {
        self.profile.preferred_spiciness = clamp_level(level);
        info!("Preferred detail level set to {}", self.profile.preferred_spiciness);
        self.persist();
    }

    /// Shift the preferred level by `delta` (e.g. an accepted feedback
    /// suggestion). Returns the new level.
    pub fn apply_spiciness_adjustment(&mut self, delta: i32) -> u8 {
        self.set_preferred_spiciness(self.profile.preferred_spiciness as i32 + delta);
        self.profile.preferred_spiciness
    }

    pub fn focus_duration(&self) -> u32 {
        self.profile.focus_duration
    }

    pub fn set_focus_duration(&mut self, minutes: i64) {
        self.profile.focus_duration = minutes.clamp(5, 60) as u32;
        info!("Focus duration set to {} min", self.profile.focus_duration);
        self.persist();
    }

    pub fn fatigue_sensitivity(&self) -> f64 {
        self.profile.fatigue_sensitivity
    }

    pub fn set_fatigue_sensitivity(&mut self, value: f64) {
        self.profile.fatigue_sensitivity =
            clamp_unit(value, 0.0, 1.0, self.profile.fatigue_sensitivity);
        info!("Fatigue sensitivity set to {:.2}", self.profile.fatigue_sensitivity);
        self.persist();
    }

    pub fn web_enabled(&self) -> bool {
        self.profile.web_enabled
    }

    pub fn set_web_enabled(&mut self, enabled: bool) {
        self.profile.web_enabled = enabled;
        info!("Web access {}", if enabled { "enabled" } else { "disabled" });
        self.persist();
    }

    pub fn total_tasks_completed(&self) -> u32 {
        self.profile.total_tasks_completed
    }

    pub fn streak_days(&self) -> u32 {
        self.profile.streak_days
    }

    pub fn last_session(&self) -> Option<&str> {
        self.profile.last_session.as_deref()
    }

    // ------------------------------------------------------------------
    // Difficulty bias
    // ------------------------------------------------------------------

    /// Bias in [-1, 1]; positive means the subject feels harder than estimated.
    pub fn difficulty_bias(&self, subject: &str) -> f64 {
        self.profile
            .difficulty_bias
            .get(subject)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_difficulty_bias(&mut self, subject: &str, bias: f64) {
        let current = self.difficulty_bias(subject);
        let bias = clamp_unit(bias, -1.0, 1.0, current);
        self.profile.difficulty_bias.insert(subject.to_string(), bias);
        debug!("Difficulty bias for {} set to {:.2}", subject, bias);
        self.persist();
    }

    /// Damped update: moves the bias by `delta * 0.1`.
    pub fn adjust_difficulty_bias(&mut self, subject: &str, delta: f64) {
        let target = self.difficulty_bias(subject) + delta * BIAS_STEP;
        self.set_difficulty_bias(subject, target);
    }

    // ------------------------------------------------------------------
    // Activity hours, streak, counters
    // ------------------------------------------------------------------

    pub fn preferred_hours(&self) -> &BTreeMap<u8, u32> {
        &self.profile.preferred_hours
    }

    pub fn record_activity_hour(&mut self, hour: u8) {
        if hour >= 24 {
            warn!("Ignoring invalid activity hour {}", hour);
            return;
        }
        *self.profile.preferred_hours.entry(hour).or_default() += 1;
        self.persist();
    }

    /// Most active hours, busiest first (earlier hour wins ties).
    /// Defaults to 9, 14 and 16 without any recorded activity.
    pub fn best_hours(&self, top_n: usize) -> Vec<u8> {
        if self.profile.preferred_hours.is_empty() {
            return DEFAULT_BEST_HOURS.to_vec();
        }

        let mut ranked: Vec<(u8, u32)> = self
            .profile
            .preferred_hours
            .iter()
            .map(|(h, c)| (*h, *c))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(top_n).map(|(h, _)| h).collect()
    }

    pub fn increment_tasks_completed(&mut self) {
        self.profile.total_tasks_completed += 1;
        self.persist();
    }

    pub fn update_last_session(&mut self) {
        self.update_last_session_at(Local::now().naive_local());
    }

    pub fn update_last_session_at(&mut self, now: NaiveDateTime) {
        self.profile.last_session = Some(now.format(SESSION_FORMAT).to_string());
        self.persist();
    }

    pub fn update_streak(&mut self) {
        self.update_streak_at(Local::now().date_naive());
    }

    /// Same day: unchanged; day after: +1; anything else, including a
    /// missing or unreadable last session: reset to 1.
    pub fn update_streak_at(&mut self, today: NaiveDate) {
        let last = self
            .profile
            .last_session
            .as_deref()
            .and_then(parse_session_date);

        match last {
            Some(day) if day == today => {}
            Some(day) if day == today - Duration::days(1) => self.profile.streak_days += 1,
            Some(_) => self.profile.streak_days = 1,
            None => {
                if self.profile.last_session.is_some() {
                    warn!("Unreadable last session date, resetting streak");
                }
                self.profile.streak_days = 1;
            }
        }

        debug!("Streak is now {} days", self.profile.streak_days);
        self.persist();
    }

    // ------------------------------------------------------------------
    // Subject preferences
    // ------------------------------------------------------------------

    pub fn subject_preference(&self, subject: &str) -> SubjectPreference {
        self.profile
            .subject_preferences
            .get(subject)
            .cloned()
            .unwrap_or_else(|| SubjectPreference {
                times_worked: 0,
                rolling_average_efficiency: 1.0,
                preferred_detail_level: self.profile.preferred_spiciness,
            })
    }

    /// Fold one more efficiency observation into the subject's rolling average
    pub fn update_subject_preference(&mut self, subject: &str, efficiency: f64) {
        let mut pref = self.subject_preference(subject);
        let count = pref.times_worked as f64;
        pref.rolling_average_efficiency =
            (pref.rolling_average_efficiency * count + efficiency) / (count + 1.0);
        pref.times_worked += 1;

        self.profile
            .subject_preferences
            .insert(subject.to_string(), pref);
        self.persist();
    }

    // ------------------------------------------------------------------
    // Suggestions and estimates
    // ------------------------------------------------------------------

    pub fn suggest_detail_level(&self, subject: &str, hour: u8, fatigue_detected: bool) -> u8 {
        estimator::suggest_detail_level(
            self.profile.preferred_spiciness,
            self.difficulty_bias(subject),
            hour,
            fatigue_detected,
        )
    }

    pub fn suggest_break_activity(&self, session_minutes: u32) -> &'static str {
        break_activity(session_minutes)
    }

    pub fn productivity_summary(&self) -> ProductivitySummary {
        ProductivitySummary {
            total_completed: self.profile.total_tasks_completed,
            streak_days: self.profile.streak_days,
            preferred_spiciness: self.profile.preferred_spiciness,
            focus_duration: self.profile.focus_duration,
            best_hours: self.best_hours(3),
            web_enabled: self.profile.web_enabled,
        }
    }

    pub fn duration_history(&self, category: &str) -> Vec<u32> {
        self.profile
            .duration_history
            .get(category)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Minutes for a task of `category`, see [`estimator::personalized_estimate`]
    pub fn personalized_estimate(
        &self,
        category: &str,
        difficulty: Difficulty,
        base_minutes: u32,
    ) -> u32 {
        estimator::personalized_estimate(
            &self.duration_history(category),
            difficulty,
            base_minutes,
            self.profile.fatigue_sensitivity,
        )
    }

    pub fn record_task_duration(&mut self, category: &str, actual_minutes: u32) {
        let history = self
            .profile
            .duration_history
            .entry(category.to_string())
            .or_default();
        history.push_back(actual_minutes);
        while history.len() > MAX_DURATION_HISTORY {
            history.pop_front();
        }
        debug!("Recorded {} min for category {}", actual_minutes, category);
        self.persist();
    }
}

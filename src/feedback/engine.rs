//! Feedback engine: explicit ratings about the *form* of answers
//!
//! Four bounded histories (detail level, duration, difficulty, session
//! satisfaction) are kept in one persisted document. The analysis helpers
//! turn recent history into adjustment proposals for the personalization
//! profile.

use crate::personalization::UserPersonalization;
use crate::storage::JsonDocument;
use crate::types::{DetailVerdict, Difficulty, DurationVerdict, Priority};
use crate::utils::time::deserialize_lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// actual/estimated above this means the estimate was too short (tunable)
pub const TOO_SHORT_RATIO: f64 = 1.3;
/// actual/estimated below this means the estimate was too long (tunable)
pub const TOO_LONG_RATIO: f64 = 0.7;
/// Allowed drift of the average efficiency from 1.0
pub const EFFICIENCY_TOLERANCE: f64 = 0.2;
/// Minimum confidence before a detail-level change is proposed
pub const SPICINESS_MIN_CONFIDENCE: f64 = 0.5;
/// Confidence above which the detail-level proposal is high priority
pub const SPICINESS_HIGH_CONFIDENCE: f64 = 0.7;
/// Average satisfaction below this raises a warning
pub const LOW_SATISFACTION: f64 = 2.5;
/// Satisfaction assumed without data
pub const NEUTRAL_SATISFACTION: f64 = 3.0;

/// Default window for detail-level and duration analysis
pub const TREND_WINDOW: usize = 20;
/// Default window for difficulty bias and satisfaction
pub const SHORT_WINDOW: usize = 10;

fn difficulty_or_medium<'de, D>(deserializer: D) -> std::result::Result<Difficulty, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(Difficulty::parse_or_medium(&raw))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpicinessEntry {
    pub task_id: String,
    #[serde(rename = "spiciness_used")]
    pub level_used: u8,
    #[serde(rename = "feedback")]
    pub verdict: DetailVerdict,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationEntry {
    pub task_id: String,
    #[serde(rename = "estimated_time")]
    pub estimated_minutes: u32,
    #[serde(rename = "actual_time")]
    pub actual_minutes: u32,
    #[serde(rename = "feedback")]
    pub verdict: DurationVerdict,
    /// estimated / actual
    pub efficiency: f64,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyEntry {
    pub task_id: String,
    #[serde(deserialize_with = "difficulty_or_medium")]
    pub estimated: Difficulty,
    #[serde(deserialize_with = "difficulty_or_medium")]
    pub perceived: Difficulty,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionEntry {
    pub session_id: String,
    pub satisfaction: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFeedback {
    pub spiciness: VecDeque<SpicinessEntry>,
    pub duration: VecDeque<DurationEntry>,
    pub difficulty: VecDeque<DifficultyEntry>,
}

/// Persisted feedback document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackDocument {
    pub form_feedback: FormFeedback,
    pub sessions: VecDeque<SatisfactionEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictTally {
    pub too_detailed: usize,
    pub just_right: usize,
    pub not_enough: usize,
}

/// Result of [`FeedbackEngine::spiciness_trend`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpicinessTrend {
    /// -1, 0 or +1
    pub adjustment: i8,
    /// Share of the winning verdict, rounded to two decimals
    pub confidence: f64,
    pub reason: String,
    pub stats: VerdictTally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateBias {
    Underestimate,
    Accurate,
    Overestimate,
}

impl fmt::Display for EstimateBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateBias::Underestimate => write!(f, "underestimate"),
            EstimateBias::Accurate => write!(f, "accurate"),
            EstimateBias::Overestimate => write!(f, "overestimate"),
        }
    }
}

/// Result of [`FeedbackEngine::duration_accuracy`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationAccuracy {
    /// Mean estimated/actual, rounded to two decimals
    pub avg_efficiency: f64,
    pub needs_adjustment: bool,
    pub bias: EstimateBias,
    pub too_short: usize,
    pub too_long: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionKind {
    Spiciness { current: u8, suggested: u8 },
    DurationEstimation { bias: EstimateBias, avg_efficiency: f64 },
    General,
}

/// A proposed profile change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationSuggestion {
    pub priority: Priority,
    #[serde(flatten)]
    pub kind: SuggestionKind,
    pub reason: String,
}

impl fmt::Display for AdaptationSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SuggestionKind::Spiciness { current, suggested } => write!(
                f,
                "[{}] detail level {} -> {}: {}",
                self.priority, current, suggested, self.reason
            ),
            SuggestionKind::DurationEstimation { avg_efficiency, .. } => write!(
                f,
                "[{}] duration estimates (efficiency {:.2}): {}",
                self.priority, avg_efficiency, self.reason
            ),
            SuggestionKind::General => write!(f, "[{}] {}", self.priority, self.reason),
        }
    }
}

/// Verdict derived from estimated vs. actual minutes
pub fn duration_verdict(estimated_minutes: u32, actual_minutes: u32) -> DurationVerdict {
    let ratio = if estimated_minutes > 0 {
        actual_minutes as f64 / estimated_minutes as f64
    } else {
        1.0
    };

    if ratio > TOO_SHORT_RATIO {
        DurationVerdict::TooShort
    } else if ratio < TOO_LONG_RATIO {
        DurationVerdict::TooLong
    } else {
        DurationVerdict::Accurate
    }
}

/// estimated/actual, 1.0 when nothing was measured
pub fn efficiency(estimated_minutes: u32, actual_minutes: u32) -> f64 {
    if actual_minutes > 0 {
        estimated_minutes as f64 / actual_minutes as f64
    } else {
        1.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn push_bounded<T>(history: &mut VecDeque<T>, entry: T, max: usize) {
    history.push_back(entry);
    while history.len() > max {
        history.pop_front();
    }
}

fn tail<T>(history: &VecDeque<T>, last_n: usize) -> impl Iterator<Item = &T> {
    history.iter().skip(history.len().saturating_sub(last_n))
}

/// Persistent feedback store with trend analysis
pub struct FeedbackEngine {
    document: JsonDocument,
    data: FeedbackDocument,
    max_history: usize,
}

impl FeedbackEngine {
    pub fn open(path: impl Into<PathBuf>, max_history: usize) -> Self {
        let document = JsonDocument::new(path);
        let data: FeedbackDocument = document.load();
        let mut engine = Self {
            document,
            data,
            max_history: max_history.max(1),
        };
        // A smaller cap than the one the file was written with
        engine.limit_history();
        engine
    }

    pub fn data(&self) -> &FeedbackDocument {
        &self.data
    }

    pub fn save(&self) -> crate::error::Result<()> {
        self.document.save(&self.data)
    }

    fn limit_history(&mut self) {
        let max = self.max_history;
        let form = &mut self.data.form_feedback;
        while form.spiciness.len() > max {
            form.spiciness.pop_front();
        }
        while form.duration.len() > max {
            form.duration.pop_front();
        }
        while form.difficulty.len() > max {
            form.difficulty.pop_front();
        }
        while self.data.sessions.len() > max {
            self.data.sessions.pop_front();
        }
    }

    fn persist(&self) {
        self.document.persist(&self.data);
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    pub fn record_spiciness_feedback(
        &mut self,
        task_id: &str,
        level_used: u8,
        verdict: DetailVerdict,
        subject: Option<&str>,
    ) {
        let entry = SpicinessEntry {
            task_id: task_id.to_string(),
            level_used,
            verdict,
            subject: subject.map(str::to_string),
            timestamp: Some(Utc::now()),
        };
        push_bounded(&mut self.data.form_feedback.spiciness, entry, self.max_history);
        info!("Recorded detail feedback {} at level {}", verdict, level_used);
        self.persist();
    }

    /// Record a duration observation. Without an explicit verdict one is
    /// derived from the actual/estimated ratio. Returns the stored verdict.
    pub fn record_duration_feedback(
        &mut self,
        task_id: &str,
        estimated_minutes: u32,
        actual_minutes: u32,
        verdict: Option<DurationVerdict>,
    ) -> DurationVerdict {
        let verdict = verdict.unwrap_or_else(|| duration_verdict(estimated_minutes, actual_minutes));
        let entry = DurationEntry {
            task_id: task_id.to_string(),
            estimated_minutes,
            actual_minutes,
            verdict,
            efficiency: efficiency(estimated_minutes, actual_minutes),
            timestamp: Some(Utc::now()),
        };
        push_bounded(&mut self.data.form_feedback.duration, entry, self.max_history);
        info!(
            "Recorded duration feedback {} ({} estimated, {} actual)",
            verdict, estimated_minutes, actual_minutes
        );
        self.persist();
        verdict
    }

    pub fn record_difficulty_feedback(
        &mut self,
        task_id: &str,
        estimated: Difficulty,
        perceived: Difficulty,
        subject: Option<&str>,
    ) {
        let entry = DifficultyEntry {
            task_id: task_id.to_string(),
            estimated,
            perceived,
            subject: subject.map(str::to_string),
            timestamp: Some(Utc::now()),
        };
        push_bounded(&mut self.data.form_feedback.difficulty, entry, self.max_history);
        info!("Recorded difficulty feedback {} -> {}", estimated, perceived);
        self.persist();
    }

    /// Scores outside 1..=5 are clamped.
    pub fn record_satisfaction_feedback(
        &mut self,
        session_id: &str,
        score: i32,
        comment: Option<&str>,
    ) {
        let satisfaction = score.clamp(1, 5) as u8;
        let entry = SatisfactionEntry {
            session_id: session_id.to_string(),
            satisfaction,
            comment: comment.map(str::to_string),
            timestamp: Some(Utc::now()),
        };
        push_bounded(&mut self.data.sessions, entry, self.max_history);
        info!("Recorded session satisfaction {}/5", satisfaction);
        self.persist();
    }

    /// Drop every history
    pub fn clear(&mut self) {
        self.data = FeedbackDocument::default();
        info!("Feedback history cleared");
        self.persist();
    }

    // ------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------

    /// Detail-level trend over the last `last_n` ratings. A direction is
    /// only proposed when its verdict is strictly the most frequent.
    pub fn spiciness_trend(&self, last_n: usize) -> SpicinessTrend {
        let mut stats = VerdictTally::default();
        for entry in tail(&self.data.form_feedback.spiciness, last_n) {
            match entry.verdict {
                DetailVerdict::TooDetailed => stats.too_detailed += 1,
                DetailVerdict::JustRight => stats.just_right += 1,
                DetailVerdict::NotEnough => stats.not_enough += 1,
            }
        }

        let total = stats.too_detailed + stats.just_right + stats.not_enough;
        if total == 0 {
            return SpicinessTrend {
                adjustment: 0,
                confidence: 0.0,
                reason: "Pas assez de données".to_string(),
                stats,
            };
        }

        let (adjustment, reason) = if stats.too_detailed > stats.not_enough
            && stats.too_detailed > stats.just_right
        {
            (-1, format!("Trop détaillé {}/{} fois", stats.too_detailed, total))
        } else if stats.not_enough > stats.too_detailed && stats.not_enough > stats.just_right {
            (1, format!("Pas assez détaillé {}/{} fois", stats.not_enough, total))
        } else {
            (0, format!("Niveau adapté {}/{} fois", stats.just_right, total))
        };

        let mode = stats.too_detailed.max(stats.just_right).max(stats.not_enough);
        let confidence = round2(mode as f64 / total as f64);

        debug!("Spiciness trend: adjustment {} confidence {}", adjustment, confidence);
        SpicinessTrend {
            adjustment,
            confidence,
            reason,
            stats,
        }
    }

    /// Mean efficiency (estimated/actual) over the last `last_n` tasks
    pub fn duration_accuracy(&self, last_n: usize) -> DurationAccuracy {
        let recent: Vec<&DurationEntry> = tail(&self.data.form_feedback.duration, last_n).collect();

        if recent.is_empty() {
            return DurationAccuracy {
                avg_efficiency: 1.0,
                needs_adjustment: false,
                bias: EstimateBias::Accurate,
                too_short: 0,
                too_long: 0,
                total: 0,
            };
        }

        let avg = recent.iter().map(|e| e.efficiency).sum::<f64>() / recent.len() as f64;
        let bias = if avg < 1.0 - EFFICIENCY_TOLERANCE {
            EstimateBias::Underestimate
        } else if avg > 1.0 + EFFICIENCY_TOLERANCE {
            EstimateBias::Overestimate
        } else {
            EstimateBias::Accurate
        };

        DurationAccuracy {
            avg_efficiency: round2(avg),
            needs_adjustment: (avg - 1.0).abs() > EFFICIENCY_TOLERANCE,
            bias,
            too_short: recent.iter().filter(|e| e.verdict == DurationVerdict::TooShort).count(),
            too_long: recent.iter().filter(|e| e.verdict == DurationVerdict::TooLong).count(),
            total: recent.len(),
        }
    }

    /// Mean of (perceived - estimated) / 2 over the subject's last `last_n`
    /// entries, in [-1, 1]; positive means harder than predicted.
    pub fn subject_difficulty_bias(&self, subject: &str, last_n: usize) -> f64 {
        let matching: Vec<&DifficultyEntry> = self
            .data
            .form_feedback
            .difficulty
            .iter()
            .filter(|e| e.subject.as_deref() == Some(subject))
            .collect();
        let recent = &matching[matching.len().saturating_sub(last_n)..];

        if recent.is_empty() {
            return 0.0;
        }

        let sum: f64 = recent
            .iter()
            .map(|e| (e.perceived.rank() - e.estimated.rank()) as f64 / 2.0)
            .sum();
        sum / recent.len() as f64
    }

    /// Mean of the last `last_n` satisfaction scores, 3.0 without data
    pub fn average_satisfaction(&self, last_n: usize) -> f64 {
        let recent: Vec<f64> = tail(&self.data.sessions, last_n)
            .map(|e| e.satisfaction as f64)
            .collect();

        if recent.is_empty() {
            return NEUTRAL_SATISFACTION;
        }
        recent.iter().sum::<f64>() / recent.len() as f64
    }

    /// Concrete profile changes backed by recent feedback, high priority first
    pub fn adaptation_suggestions(&self, profile: &UserPersonalization) -> Vec<AdaptationSuggestion> {
        let mut suggestions = Vec::new();

        let trend = self.spiciness_trend(TREND_WINDOW);
        if trend.adjustment != 0 && trend.confidence > SPICINESS_MIN_CONFIDENCE {
            let current = profile.preferred_spiciness();
            let suggested = (current as i32 + trend.adjustment as i32).clamp(1, 5) as u8;
            suggestions.push(AdaptationSuggestion {
                priority: if trend.confidence > SPICINESS_HIGH_CONFIDENCE {
                    Priority::High
                } else {
                    Priority::Medium
                },
                kind: SuggestionKind::Spiciness { current, suggested },
                reason: trend.reason,
            });
        }

        let accuracy = self.duration_accuracy(TREND_WINDOW);
        if accuracy.needs_adjustment {
            suggestions.push(AdaptationSuggestion {
                priority: Priority::Medium,
                kind: SuggestionKind::DurationEstimation {
                    bias: accuracy.bias,
                    avg_efficiency: accuracy.avg_efficiency,
                },
                reason: format!("Les estimations sont souvent {}", accuracy.bias),
            });
        }

        let satisfaction = self.average_satisfaction(SHORT_WINDOW);
        if satisfaction < LOW_SATISFACTION {
            suggestions.push(AdaptationSuggestion {
                priority: Priority::High,
                kind: SuggestionKind::General,
                reason: format!("Satisfaction moyenne faible ({:.1}/5)", satisfaction),
            });
        }

        suggestions.sort_by_key(|s| s.priority.rank());
        suggestions
    }
}

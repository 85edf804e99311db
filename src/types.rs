//! Core vocabulary shared by every Focuspath component
//!
//! Element kinds, gap priorities, difficulty grades and the various feedback
//! verdicts all travel between the memory, the feedback parser, the feedback
//! engine and the decision engine, so they live here rather than in any one
//! of those modules.

use crate::error::FocuspathError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Flag count at which a topic becomes high priority (tunable).
pub const HIGH_PRIORITY_FLAGS: u32 = 3;

/// Flag count at which a topic becomes medium priority (tunable).
pub const MEDIUM_PRIORITY_FLAGS: u32 = 2;

/// Level label handed to content providers when the classifier gave none.
pub const DEFAULT_LEVEL: &str = "premiere";

/// Kind of pedagogical content that can be missing from an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Dates,
    Figures,
    Definitions,
    Formulas,
    Examples,
    Methodology,
    Context,
    Summary,
}

impl ElementKind {
    /// Every kind, in canonical order
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Dates,
        ElementKind::Figures,
        ElementKind::Definitions,
        ElementKind::Formulas,
        ElementKind::Examples,
        ElementKind::Methodology,
        ElementKind::Context,
        ElementKind::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Dates => "dates",
            ElementKind::Figures => "figures",
            ElementKind::Definitions => "definitions",
            ElementKind::Formulas => "formulas",
            ElementKind::Examples => "examples",
            ElementKind::Methodology => "methodology",
            ElementKind::Context => "context",
            ElementKind::Summary => "summary",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = FocuspathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ElementKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| FocuspathError::ValidationError(format!("Unknown element kind: {}", s)))
    }
}

/// Gap priority, derived from how often a topic was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Pure function of the flag count: >=3 high, >=2 medium, else low.
    pub fn from_times_flagged(times_flagged: u32) -> Self {
        if times_flagged >= HIGH_PRIORITY_FLAGS {
            Priority::High
        } else if times_flagged >= MEDIUM_PRIORITY_FLAGS {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// Sort rank, high first (high=0, medium=1, low=2)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    /// Whether this priority triggers automatic injection
    pub fn is_actionable(&self) -> bool {
        *self >= Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = FocuspathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(FocuspathError::ValidationError(format!(
                "Unknown priority: {}",
                other
            ))),
        }
    }
}

/// Difficulty grade of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Ordinal rank used for bias arithmetic (easy=1, medium=2, hard=3)
    pub fn rank(&self) -> i32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Duration multiplier applied by the personalized estimator
    pub fn estimate_multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.8,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    /// Parse, treating unknown labels as medium
    pub fn parse_or_medium(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = FocuspathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(FocuspathError::ValidationError(format!(
                "Unknown difficulty: {}",
                other
            ))),
        }
    }
}

/// User verdict on the detail level ("spiciness") of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailVerdict {
    TooDetailed,
    JustRight,
    NotEnough,
}

impl std::fmt::Display for DetailVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailVerdict::TooDetailed => write!(f, "too_detailed"),
            DetailVerdict::JustRight => write!(f, "just_right"),
            DetailVerdict::NotEnough => write!(f, "not_enough"),
        }
    }
}

impl FromStr for DetailVerdict {
    type Err = FocuspathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "too_detailed" => Ok(DetailVerdict::TooDetailed),
            "just_right" => Ok(DetailVerdict::JustRight),
            "not_enough" => Ok(DetailVerdict::NotEnough),
            other => Err(FocuspathError::ValidationError(format!(
                "Unknown detail verdict: {}",
                other
            ))),
        }
    }
}

/// Verdict on a duration estimate.
///
/// `TooShort` means the estimate was too short (the task took longer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationVerdict {
    TooShort,
    Accurate,
    TooLong,
}

impl std::fmt::Display for DurationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationVerdict::TooShort => write!(f, "too_short"),
            DurationVerdict::Accurate => write!(f, "accurate"),
            DurationVerdict::TooLong => write!(f, "too_long"),
        }
    }
}

impl FromStr for DurationVerdict {
    type Err = FocuspathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "too_short" => Ok(DurationVerdict::TooShort),
            "accurate" => Ok(DurationVerdict::Accurate),
            "too_long" => Ok(DurationVerdict::TooLong),
            other => Err(FocuspathError::ValidationError(format!(
                "Unknown duration verdict: {}",
                other
            ))),
        }
    }
}

/// Overall tone of a free-text critique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Where the primary content for a task comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Local per-subject rule tables
    Local,
    /// Learned gap memory
    Memory,
    /// External web search
    Web,
    /// Language-model decomposition API
    Api,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Local => write!(f, "local"),
            DataSource::Memory => write!(f, "memory"),
            DataSource::Web => write!(f, "web"),
            DataSource::Api => write!(f, "api"),
        }
    }
}

/// Coarse schooling stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchoolTier {
    /// Collège (6e to 3e)
    LowerSecondary,
    /// Lycée (seconde to terminale)
    #[default]
    UpperSecondary,
    /// Université (L1 to L3)
    Tertiary,
}

impl SchoolTier {
    /// Map a specific level label to its tier; unknown labels fall back to
    /// upper-secondary.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "6eme" | "5eme" | "4eme" | "3eme" => SchoolTier::LowerSecondary,
            "seconde" | "premiere" | "terminale" => SchoolTier::UpperSecondary,
            "l1" | "l2" | "l3" => SchoolTier::Tertiary,
            _ => SchoolTier::default(),
        }
    }
}

impl std::fmt::Display for SchoolTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchoolTier::LowerSecondary => write!(f, "lower_secondary"),
            SchoolTier::UpperSecondary => write!(f, "upper_secondary"),
            SchoolTier::Tertiary => write!(f, "tertiary"),
        }
    }
}

/// Attribute bundle produced by the external task classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub subject: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub level: String,
    /// Minutes available, when the task text stated a deadline
    pub time_constraint: Option<u32>,
}

impl TaskContext {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            task_type: "autre".to_string(),
            level: DEFAULT_LEVEL.to_string(),
            time_constraint: None,
        }
    }

    pub fn tier(&self) -> SchoolTier {
        SchoolTier::from_level(&self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_thresholds() {
        assert_eq!(Priority::from_times_flagged(0), Priority::Low);
        assert_eq!(Priority::from_times_flagged(1), Priority::Low);
        assert_eq!(Priority::from_times_flagged(2), Priority::Medium);
        assert_eq!(Priority::from_times_flagged(3), Priority::High);
        assert_eq!(Priority::from_times_flagged(42), Priority::High);
    }

    #[test]
    fn test_priority_ordering_and_rank() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::High.rank(), 0);
        assert_eq!(Priority::Low.rank(), 2);
        assert!(Priority::Medium.is_actionable());
        assert!(!Priority::Low.is_actionable());
    }

    #[test]
    fn test_element_kind_round_trip_through_str() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.to_string().parse::<ElementKind>().unwrap(), kind);
        }
        assert!("recipes".parse::<ElementKind>().is_err());
    }

    #[test]
    fn test_element_kind_serde_is_lowercase() {
        let json = serde_json::to_string(&ElementKind::Methodology).unwrap();
        assert_eq!(json, "\"methodology\"");
    }

    #[test]
    fn test_difficulty_rank_and_multiplier() {
        assert_eq!(Difficulty::Easy.rank(), 1);
        assert_eq!(Difficulty::Hard.rank(), 3);
        assert_eq!(Difficulty::Hard.estimate_multiplier(), 1.3);
        assert_eq!(Difficulty::parse_or_medium("brutal"), Difficulty::Medium);
    }

    #[test]
    fn test_verdict_parsing_accepts_dashes() {
        assert_eq!(
            "too-detailed".parse::<DetailVerdict>().unwrap(),
            DetailVerdict::TooDetailed
        );
        assert_eq!(
            "too_long".parse::<DurationVerdict>().unwrap(),
            DurationVerdict::TooLong
        );
    }

    #[test]
    fn test_school_tier_from_level() {
        assert_eq!(SchoolTier::from_level("4eme"), SchoolTier::LowerSecondary);
        assert_eq!(SchoolTier::from_level("terminale"), SchoolTier::UpperSecondary);
        assert_eq!(SchoolTier::from_level("L2"), SchoolTier::Tertiary);
        assert_eq!(SchoolTier::from_level("master"), SchoolTier::UpperSecondary);
    }

    #[test]
    fn test_task_context_serializes_type_field() {
        let ctx = TaskContext::new("maths");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["type"], "autre");
        assert_eq!(json["level"], DEFAULT_LEVEL);
    }
}

//! User feedback: ratings about the form of answers and free-text
//! critiques about their content

pub mod engine;
pub mod patterns;
pub mod pedagogical;

pub use engine::{
    AdaptationSuggestion, DurationAccuracy, EstimateBias, FeedbackEngine, SpicinessTrend,
    SuggestionKind,
};
pub use pedagogical::{
    EnrichmentSuggestion, FeedbackTrends, ParsedFeedback, PedagogicalFeedbackParser, QualityIssue,
};

//! Pedagogical feedback parser
//!
//! Turns a free-text critique about the *content* of an answer ("il manque
//! les dates", "les formules ne sont pas claires") into structured gap
//! signals. Matching is pattern based, see [`super::patterns`].

use super::patterns::{
    element_patterns, enrichment_action, matching_quality_indicators, missing_indicator,
    NEGATIVE_WORDS, POSITIVE_WORDS,
};
use crate::memory::KnowledgeMemory;
use crate::types::{ElementKind, Priority, Sentiment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Parser history bound
pub const DEFAULT_PARSER_HISTORY: usize = 200;

/// Problem reported about an element that is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Unclear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub element: ElementKind,
    pub issue: IssueKind,
}

/// Structured reading of one critique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFeedback {
    pub original_text: String,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub missing_elements: BTreeSet<ElementKind>,
    pub quality_issues: Vec<QualityIssue>,
    pub sentiment: Sentiment,
    pub timestamp: DateTime<Utc>,
}

/// Remediation proposal built from parser history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentSuggestion {
    pub element_type: ElementKind,
    pub times_requested: usize,
    pub priority: Priority,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSatisfaction {
    Good,
    NeedsImprovement,
}

/// Aggregate over the most recent critiques
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackTrends {
    pub total_feedback: usize,
    pub most_missing_elements: Vec<(ElementKind, usize)>,
    pub subjects_needing_attention: Vec<(String, usize)>,
    pub sentiment_distribution: SentimentDistribution,
    pub overall_satisfaction: OverallSatisfaction,
}

/// Kinds whose pattern matches `text` (lower-cased), canonical order
fn matching_kinds(text: &str) -> impl Iterator<Item = ElementKind> + '_ {
    element_patterns()
        .iter()
        .filter(move |(_, pattern)| pattern.is_match(text))
        .map(|(kind, _)| *kind)
}

/// Majority vote between positive and negative word counts; tie is neutral.
pub fn detect_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Missing kinds only; empty unless a missing indicator is present.
pub fn identify_missing_elements(text: &str) -> BTreeSet<ElementKind> {
    let text = text.to_lowercase();
    if !missing_indicator().is_match(&text) {
        return BTreeSet::new();
    }
    matching_kinds(&text).collect()
}

fn rank_counts<K: Ord + Clone>(counts: BTreeMap<K, usize>, keep: usize) -> Vec<(K, usize)> {
    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(keep);
    ranked
}

/// Pattern-based critique parser with a bounded in-process history
#[derive(Debug, Clone)]
pub struct PedagogicalFeedbackParser {
    history: VecDeque<ParsedFeedback>,
    max_history: usize,
}

impl Default for PedagogicalFeedbackParser {
    fn default() -> Self {
        Self::new(DEFAULT_PARSER_HISTORY)
    }
}

impl PedagogicalFeedbackParser {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ParsedFeedback> {
        self.history.iter()
    }

    /// Parse `text`, remember the result and, when `memory` is given and
    /// gaps were found, flag them there (topic defaults to "general").
    pub fn parse_feedback(
        &mut self,
        text: &str,
        subject: Option<&str>,
        topic: Option<&str>,
        memory: Option<&mut KnowledgeMemory>,
    ) -> ParsedFeedback {
        let lowered = text.to_lowercase();

        let missing_elements = identify_missing_elements(&lowered);

        let mut quality_issues = Vec::new();
        for indicator in matching_quality_indicators(&lowered) {
            // First matching kind only
            if let Some(element) = matching_kinds(&lowered).next() {
                debug!("Quality indicator '{}' attached to {}", indicator, element);
                quality_issues.push(QualityIssue {
                    element,
                    issue: IssueKind::Unclear,
                });
            }
        }

        let parsed = ParsedFeedback {
            original_text: text.to_string(),
            subject: subject.map(str::to_string),
            topic: topic.map(str::to_string),
            missing_elements,
            quality_issues,
            sentiment: detect_sentiment(&lowered),
            timestamp: Utc::now(),
        };

        debug!(
            "Parsed critique: {} missing, {} quality issues, {}",
            parsed.missing_elements.len(),
            parsed.quality_issues.len(),
            parsed.sentiment
        );

        if let Some(memory) = memory {
            if !parsed.missing_elements.is_empty() {
                let kinds: Vec<ElementKind> = parsed.missing_elements.iter().copied().collect();
                memory.record_multiple_missing(subject.unwrap_or_default(), topic, &kinds);
            }
        }

        self.history.push_back(parsed.clone());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }

        parsed
    }

    /// Missing kinds requested for a subject (and topic, when given),
    /// most requested first.
    pub fn enrichment_suggestions(
        &self,
        subject: &str,
        topic: Option<&str>,
    ) -> Vec<EnrichmentSuggestion> {
        let mut counts: BTreeMap<ElementKind, usize> = BTreeMap::new();

        let relevant = self.history.iter().filter(|f| {
            f.subject.as_deref() == Some(subject)
                && topic.map_or(true, |t| f.topic.as_deref() == Some(t))
        });
        for feedback in relevant {
            for kind in &feedback.missing_elements {
                *counts.entry(*kind).or_default() += 1;
            }
        }

        rank_counts(counts, usize::MAX)
            .into_iter()
            .map(|(kind, count)| EnrichmentSuggestion {
                element_type: kind,
                times_requested: count,
                priority: Priority::from_times_flagged(count as u32),
                action: enrichment_action(kind),
            })
            .collect()
    }

    /// High-priority actions among the top three suggestions
    pub fn quick_fixes(&self, subject: &str) -> Vec<&'static str> {
        self.enrichment_suggestions(subject, None)
            .into_iter()
            .take(3)
            .filter(|s| s.priority == Priority::High)
            .map(|s| s.action)
            .collect()
    }

    /// Trends over the last `last_n` critiques
    pub fn feedback_trends(&self, last_n: usize) -> FeedbackTrends {
        let skip = self.history.len().saturating_sub(last_n);
        let recent: Vec<&ParsedFeedback> = self.history.iter().skip(skip).collect();

        let mut missing: BTreeMap<ElementKind, usize> = BTreeMap::new();
        let mut subjects: BTreeMap<String, usize> = BTreeMap::new();
        let mut sentiments = SentimentDistribution::default();

        for feedback in &recent {
            for kind in &feedback.missing_elements {
                *missing.entry(*kind).or_default() += 1;
            }
            if let Some(subject) = &feedback.subject {
                *subjects.entry(subject.clone()).or_default() += 1;
            }
            match feedback.sentiment {
                Sentiment::Positive => sentiments.positive += 1,
                Sentiment::Neutral => sentiments.neutral += 1,
                Sentiment::Negative => sentiments.negative += 1,
            }
        }

        let overall_satisfaction = if sentiments.positive > sentiments.negative {
            OverallSatisfaction::Good
        } else {
            OverallSatisfaction::NeedsImprovement
        };

        FeedbackTrends {
            total_feedback: recent.len(),
            most_missing_elements: rank_counts(missing, 5),
            subjects_needing_attention: rank_counts(subjects, 3),
            sentiment_distribution: sentiments,
            overall_satisfaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dates_detected() {
        let mut parser = PedagogicalFeedbackParser::default();
        let parsed = parser.parse_feedback("Il manque les dates importantes", Some("histoire"), None, None);

        assert!(parsed.missing_elements.contains(&ElementKind::Dates));
        assert_eq!(parsed.subject.as_deref(), Some("histoire"));
    }

    #[test]
    fn test_no_indicator_means_no_missing_elements() {
        let mut parser = PedagogicalFeedbackParser::default();
        let parsed = parser.parse_feedback("Les dates sont parfaites", None, None, None);

        assert!(parsed.missing_elements.is_empty());
        assert_eq!(parsed.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_quality_issue_is_independent_of_missing_indicator() {
        let mut parser = PedagogicalFeedbackParser::default();
        let parsed = parser.parse_feedback(
            "Les définitions ne sont pas claires, les formules aussi",
            None,
            None,
            None,
        );

        // "pas clair" matches; first kind in canonical order is definitions
        assert!(parsed.missing_elements.is_empty());
        assert_eq!(
            parsed.quality_issues,
            vec![QualityIssue {
                element: ElementKind::Definitions,
                issue: IssueKind::Unclear
            }]
        );
    }

    #[test]
    fn test_each_quality_indicator_adds_one_issue() {
        let mut parser = PedagogicalFeedbackParser::default();
        let parsed = parser.parse_feedback("La méthode est floue et confuse", None, None, None);

        assert_eq!(parsed.quality_issues.len(), 2);
        assert!(parsed
            .quality_issues
            .iter()
            .all(|i| i.element == ElementKind::Methodology));
    }

    #[test]
    fn test_sentiment_vote() {
        assert_eq!(detect_sentiment("Super, merci !"), Sentiment::Positive);
        assert_eq!(detect_sentiment("Franchement nul et décevant"), Sentiment::Negative);
        assert_eq!(detect_sentiment("super mais nul"), Sentiment::Neutral);
        assert_eq!(detect_sentiment("ok"), Sentiment::Neutral);
    }

    #[test]
    fn test_parse_records_into_memory() {
        let dir = TempDir::new().unwrap();
        let mut memory = KnowledgeMemory::open(dir.path().join("km.json"));
        let mut parser = PedagogicalFeedbackParser::default();

        parser.parse_feedback(
            "Il manque les dates et les personnages",
            Some("histoire"),
            None,
            Some(&mut memory),
        );

        let gaps = memory.missing_elements("histoire", Some("general"));
        assert!(gaps.contains(&ElementKind::Dates));
        assert!(gaps.contains(&ElementKind::Figures));
    }

    #[test]
    fn test_enrichment_suggestions_rank_by_frequency() {
        let mut parser = PedagogicalFeedbackParser::default();
        for _ in 0..3 {
            parser.parse_feedback("Il manque les dates", Some("histoire"), Some("ww1"), None);
        }
        parser.parse_feedback("Pas assez de formules", Some("histoire"), Some("ww1"), None);
        parser.parse_feedback("Il manque les dates", Some("maths"), None, None);

        let suggestions = parser.enrichment_suggestions("histoire", None);
        assert_eq!(suggestions[0].element_type, ElementKind::Dates);
        assert_eq!(suggestions[0].times_requested, 3);
        assert_eq!(suggestions[0].priority, Priority::High);
        assert_eq!(suggestions[1].element_type, ElementKind::Formulas);
        assert_eq!(suggestions[1].priority, Priority::Low);

        assert!(parser.enrichment_suggestions("histoire", Some("ww2")).is_empty());
        assert!(parser.enrichment_suggestions("svt", None).is_empty());

        assert_eq!(
            parser.quick_fixes("histoire"),
            vec!["Ajouter une frise chronologique avec les dates clés"]
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut parser = PedagogicalFeedbackParser::new(3);
        for i in 0..5 {
            parser.parse_feedback(&format!("retour {}", i), None, None, None);
        }
        let texts: Vec<&str> = parser.history().map(|f| f.original_text.as_str()).collect();
        assert_eq!(texts, vec!["retour 2", "retour 3", "retour 4"]);
    }

    #[test]
    fn test_feedback_trends() {
        let mut parser = PedagogicalFeedbackParser::default();
        assert_eq!(parser.feedback_trends(20).total_feedback, 0);

        parser.parse_feedback("Il manque les dates, merci", Some("histoire"), None, None);
        parser.parse_feedback("Il manque les dates", Some("histoire"), None, None);
        parser.parse_feedback("Super", Some("maths"), None, None);

        let trends = parser.feedback_trends(20);
        assert_eq!(trends.total_feedback, 3);
        assert_eq!(trends.most_missing_elements[0], (ElementKind::Dates, 2));
        assert_eq!(trends.subjects_needing_attention[0], ("histoire".to_string(), 2));
        assert_eq!(trends.sentiment_distribution.positive, 2);
        assert_eq!(trends.overall_satisfaction, OverallSatisfaction::Good);

        assert_eq!(parser.feedback_trends(1).total_feedback, 1);
    }
}

//! Keyword tables deciding whether a task needs factual data
//!
//! Built once and handed to the engine; never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Immutable decision tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionRules {
    /// Any of these anywhere in the task text means factual data is needed
    pub factual_keywords: Vec<String>,
    /// Subjects where the specific phrases below also count
    pub factual_subjects: Vec<String>,
    pub factual_phrases: Vec<String>,
}

impl Default for DecisionRules {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        Self {
            factual_keywords: owned(&[
                "date",
                "année",
                "quand",
                "qui",
                "où",
                "combien",
                "chiffre",
                "statistique",
                "événement",
                "découverte",
                "invention",
            ]),
            factual_subjects: owned(&["histoire", "géographie", "svt", "physique", "chimie"]),
            factual_phrases: owned(&[
                "quelle est la date",
                "qui a",
                "quand a eu lieu",
                "quel événement",
                "quelle formule",
                "quel théorème",
            ]),
        }
    }
}

impl DecisionRules {
    /// Substring match on the lower-cased task: a factual keyword, or a
    /// factual subject together with one of its specific phrases.
    pub fn requires_factual_data(&self, task: &str, subject: &str) -> bool {
        let task = task.to_lowercase();

        let has_keyword = self.factual_keywords.iter().any(|kw| task.contains(kw.as_str()));
        if has_keyword {
            return true;
        }

        let subject = subject.trim().to_lowercase();
        self.factual_subjects.iter().any(|s| *s == subject)
            && self.factual_phrases.iter().any(|p| task.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_triggers_regardless_of_subject() {
        let rules = DecisionRules::default();
        assert!(rules.requires_factual_data("En quelle année est né Molière ?", "français"));
        assert!(rules.requires_factual_data("Combien de régions en France", "maths"));
    }

    #[test]
    fn test_no_keyword_no_phrase() {
        let rules = DecisionRules::default();
        assert!(!rules.requires_factual_data("Faire les exercices 3 et 4", "maths"));
    }

    #[test]
    fn test_phrase_needs_factual_subject() {
        let rules = DecisionRules {
            factual_keywords: Vec::new(),
            ..DecisionRules::default()
        };
        assert!(rules.requires_factual_data("Quelle formule pour la vitesse", "physique"));
        assert!(!rules.requires_factual_data("Quelle formule pour la vitesse", "maths"));
    }
}

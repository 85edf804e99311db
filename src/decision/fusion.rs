//! Combining local, memory and web bundles
//!
//! Local material seeds every list. Web material, when the search
//! succeeded, is appended without duplicating items that share a natural
//! key (term, date, formula name, figure name). Memory never adds content,
//! only the list of element kinds to inject.

use crate::services::{DateEvent, Definition, Figure, Formula, StaticContent, WebEnrichment};
use crate::types::ElementKind;
use serde::Serialize;
use std::collections::HashSet;

/// Item identified by a natural key for de-duplication
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Definition {
    fn key(&self) -> &str {
        &self.term
    }
}

impl Keyed for DateEvent {
    fn key(&self) -> &str {
        &self.date
    }
}

impl Keyed for Formula {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for Figure {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// Append the items of `extra` whose key is not yet present in `base`
pub fn merge_unique<T: Keyed + Clone>(base: &mut Vec<T>, extra: &[T]) {
    let mut seen: HashSet<String> = base.iter().map(|item| item.key().to_string()).collect();
    for item in extra {
        if seen.insert(item.key().to_string()) {
            base.push(item.clone());
        }
    }
}

/// Final content handed to the answer generator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FusedBundle {
    pub definitions: Vec<Definition>,
    pub formulas: Vec<Formula>,
    pub dates: Vec<DateEvent>,
    pub figures: Vec<Figure>,
    pub methodology: Vec<String>,
    pub common_mistakes: Vec<String>,
    /// Web facts, de-duplicated by text
    pub facts: Vec<String>,
    /// Known gaps to cover explicitly
    pub elements_to_inject: Vec<ElementKind>,
}

pub fn fuse(
    local: &StaticContent,
    web: Option<&WebEnrichment>,
    elements_to_inject: &[ElementKind],
) -> FusedBundle {
    let mut fused = FusedBundle {
        definitions: local.definitions.clone(),
        formulas: local.formulas.clone(),
        dates: local.dates.clone(),
        figures: local.figures.clone(),
        methodology: local.methodology.clone(),
        common_mistakes: local.common_mistakes.clone(),
        facts: Vec::new(),
        elements_to_inject: elements_to_inject.to_vec(),
    };

    if let Some(web) = web.filter(|w| w.success) {
        merge_unique(&mut fused.definitions, &web.definitions);
        merge_unique(&mut fused.dates, &web.dates);
        merge_unique(&mut fused.formulas, &web.formulas);
        merge_unique(&mut fused.figures, &web.figures);
        merge_unique(&mut fused.facts, &web.facts);
    }

    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(term: &str, definition: &str) -> Definition {
        Definition {
            term: term.to_string(),
            definition: definition.to_string(),
        }
    }

    #[test]
    fn test_web_duplicates_are_skipped_and_new_terms_appended() {
        let local = StaticContent {
            definitions: vec![def("Tiers État", "local")],
            ..Default::default()
        };
        let web = WebEnrichment {
            success: true,
            definitions: vec![def("Tiers État", "web"), def("Jacobins", "web"), def("Jacobins", "dup")],
            ..Default::default()
        };

        let fused = fuse(&local, Some(&web), &[]);
        let terms: Vec<(&str, &str)> = fused
            .definitions
            .iter()
            .map(|d| (d.term.as_str(), d.definition.as_str()))
            .collect();
        assert_eq!(terms, vec![("Tiers État", "local"), ("Jacobins", "web")]);
    }

    #[test]
    fn test_failed_web_result_is_ignored() {
        let mut web = WebEnrichment::failure("timeout");
        web.definitions.push(def("X", "y"));

        let fused = fuse(&StaticContent::default(), Some(&web), &[]);
        assert!(fused.definitions.is_empty());
    }

    #[test]
    fn test_memory_only_feeds_injection_list() {
        let local = StaticContent {
            methodology: vec!["Lire".to_string()],
            ..Default::default()
        };
        let fused = fuse(&local, None, &[ElementKind::Dates]);
        assert_eq!(fused.elements_to_inject, vec![ElementKind::Dates]);
        assert!(fused.dates.is_empty());
        assert_eq!(fused.methodology, vec!["Lire".to_string()]);
    }
}

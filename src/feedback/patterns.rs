//! Pre-compiled keyword tables for the pedagogical feedback parser
//!
//! All patterns run against lower-cased text and are plain substring
//! matches (no word boundaries), so "cas" also matches inside "cascade".

use crate::types::ElementKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Per-kind alternatives describing *what* is missing
const ELEMENT_KEYWORDS: [(ElementKind, &[&str]); 8] = [
    (
        ElementKind::Dates,
        &[
            r"date[s]?",
            r"année[s]?",
            r"quand",
            r"chronologi[eq]",
            r"période[s]?",
            r"époque[s]?",
            r"siècle[s]?",
        ],
    ),
    (
        ElementKind::Figures,
        &[
            r"personnage[s]?",
            r"auteur[s]?",
            r"scientifique[s]?",
            r"qui",
            r"nom[s]?",
            r"personne[s]?",
            r"historien[s]?",
        ],
    ),
    (
        ElementKind::Definitions,
        &[
            r"définition[s]?",
            r"terme[s]?",
            r"vocabulaire",
            r"mot[s]?-clé[s]?",
            r"concept[s]?",
            r"notion[s]?",
        ],
    ),
    (
        ElementKind::Formulas,
        &[
            r"formule[s]?",
            r"équation[s]?",
            r"calcul[s]?",
            r"théorème[s]?",
            r"loi[s]?",
            r"propriété[s]?",
        ],
    ),
    (
        ElementKind::Examples,
        &[
            r"exemple[s]?",
            r"illustration[s]?",
            r"cas",
            r"application[s]?",
            r"exercice[s]? résolu[s]?",
        ],
    ),
    (
        ElementKind::Methodology,
        &[
            r"méthode[s]?",
            r"méthodologi[eq]",
            r"étape[s]?",
            r"comment",
            r"procédure[s]?",
            r"démarche[s]?",
        ],
    ),
    (
        ElementKind::Context,
        &[
            r"contexte",
            r"cause[s]?",
            r"conséquence[s]?",
            r"pourquoi",
            r"raison[s]?",
            r"origine[s]?",
        ],
    ),
    (
        ElementKind::Summary,
        &[
            r"résumé",
            r"synthèse",
            r"récapitulatif",
            r"l'essentiel",
            r"points? clé[s]?",
        ],
    ),
];

/// Phrases signalling that something is missing
const MISSING_INDICATORS: &[&str] = &[
    "manque",
    "pas assez",
    "insuffisant",
    "absent",
    "aurais aimé",
    "aurais voulu",
    "il faudrait",
    "besoin de",
    "ajouter",
    "plus de",
    "où sont",
];

/// Phrases signalling that something present is unclear. Each one that
/// matches produces its own quality issue.
pub const QUALITY_INDICATORS: &[&str] = &[
    "pas clair",
    "confus",
    "incompréhensible",
    "compliqué",
    "mal expliqué",
    "difficile à comprendre",
    "flou",
];

pub const POSITIVE_WORDS: &[&str] = &["bien", "super", "parfait", "merci", "top", "génial", "utile"];

pub const NEGATIVE_WORDS: &[&str] = &["nul", "mauvais", "inutile", "horrible", "décevant", "frustrant"];

/// One compiled alternation per element kind, in canonical kind order
pub fn element_patterns() -> &'static [(ElementKind, Regex)] {
    static PATTERNS: Lazy<Vec<(ElementKind, Regex)>> = Lazy::new(|| {
        ELEMENT_KEYWORDS
            .iter()
            .map(|(kind, alternatives)| {
                let regex = Regex::new(&alternatives.join("|")).expect("Valid element pattern");
                (*kind, regex)
            })
            .collect()
    });
    &PATTERNS
}

/// Any missing-indicator phrase
pub fn missing_indicator() -> &'static Regex {
    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        let alternatives: Vec<String> = MISSING_INDICATORS.iter().map(|p| regex::escape(p)).collect();
        Regex::new(&alternatives.join("|")).expect("Valid missing indicator regex")
    });
    &PATTERN
}

/// Quality indicators present in `text` (already lower-cased), in table order
pub fn matching_quality_indicators(text: &str) -> impl Iterator<Item = &'static str> + '_ {
    QUALITY_INDICATORS
        .iter()
        .copied()
        .filter(move |indicator| text.contains(indicator))
}

/// Fixed remediation action for a kind of missing content
pub fn enrichment_action(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Dates => "Ajouter une frise chronologique avec les dates clés",
        ElementKind::Figures => "Inclure les personnages/auteurs importants avec leur rôle",
        ElementKind::Definitions => "Ajouter un glossaire avec définitions claires",
        ElementKind::Formulas => "Inclure les formules avec exemples d'application",
        ElementKind::Examples => "Ajouter des exemples concrets et résolus",
        ElementKind::Methodology => "Détailler les étapes méthodologiques",
        ElementKind::Context => "Expliquer le contexte et les causes/conséquences",
        ElementKind::Summary => "Ajouter un résumé des points essentiels",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_matching(text: &str) -> Vec<ElementKind> {
        element_patterns()
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }

    #[test]
    fn test_every_kind_has_a_pattern() {
        let kinds: Vec<ElementKind> = element_patterns().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ElementKind::ALL.to_vec());
    }

    #[test]
    fn test_element_patterns() {
        assert_eq!(kinds_matching("les siècles"), vec![ElementKind::Dates]);
        assert_eq!(kinds_matching("des mots-clés"), vec![ElementKind::Definitions]);
        assert_eq!(kinds_matching("un théorème"), vec![ElementKind::Formulas]);
        assert_eq!(kinds_matching("exercices résolus"), vec![ElementKind::Examples]);
        assert_eq!(kinds_matching("la synthèse"), vec![ElementKind::Summary]);
        assert!(kinds_matching("rien à signaler").is_empty());
        // Substring semantics: "cas" inside "cascade"
        assert_eq!(kinds_matching("une cascade"), vec![ElementKind::Examples]);
    }

    #[test]
    fn test_missing_indicator() {
        assert!(missing_indicator().is_match("il manque les dates"));
        assert!(missing_indicator().is_match("j'aurais aimé plus"));
        assert!(!missing_indicator().is_match("parfait, merci"));
    }

    #[test]
    fn test_quality_indicators_in_order() {
        let found: Vec<&str> = matching_quality_indicators("c'est flou et pas clair").collect();
        assert_eq!(found, vec!["pas clair", "flou"]);
    }

    #[test]
    fn test_every_kind_has_an_action() {
        for kind in ElementKind::ALL {
            assert!(!enrichment_action(kind).is_empty());
        }
    }
}

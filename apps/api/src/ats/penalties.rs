use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::signals::contains_term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PenaltyKind {
    RepeatedVerb,
    OutdatedSection,
    Buzzword,
    WeakPhrase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    pub kind: PenaltyKind,
    pub detail: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PenaltyConfig {
    /// Uses of the same action verb allowed before each extra one costs points.
    pub verb_repeat_allowance: u32,
    pub per_verb_repeat: f64,
    pub per_outdated_section: f64,
    pub per_buzzword: f64,
    pub per_weak_phrase: f64,
    /// Aggregate cap for buzzword and weak-phrase deductions.
    pub phrase_cap: f64,
    pub outdated_sections: Vec<String>,
    pub buzzwords: Vec<String>,
    pub weak_phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            verb_repeat_allowance: 2,
            per_verb_repeat: 2.0,
            per_outdated_section: 5.0,
            per_buzzword: 1.0,
            per_weak_phrase: 1.0,
            phrase_cap: 10.0,
            outdated_sections: strings(&[
                "references available upon request",
                "references upon request",
                "marital status",
                "date of birth",
                "place of birth",
                "nationality:",
                "religion:",
            ]),
            buzzwords: strings(&[
                "synergy",
                "go-getter",
                "think outside the box",
                "results-driven",
                "detail-oriented",
                "team player",
                "hard worker",
                "self-starter",
                "dynamic",
                "best of breed",
            ]),
            weak_phrases: strings(&[
                "responsible for",
                "duties included",
                "worked on",
                "helped with",
                "assisted with",
                "was involved in",
                "tasked with",
            ]),
        }
    }
}

/// Deductions found in `lower` (lower-cased résumé text) plus the verb frequencies
/// from text analysis. Returned in a stable order: repeated verbs, outdated
/// sections, buzzwords, weak phrases.
pub fn assess(
    lower: &str,
    verb_frequency: &BTreeMap<String, u32>,
    config: &PenaltyConfig,
) -> Vec<Penalty> {
    let mut penalties = Vec::new();

    for (verb, count) in verb_frequency {
        if *count > config.verb_repeat_allowance {
            penalties.push(Penalty {
                kind: PenaltyKind::RepeatedVerb,
                detail: format!("'{verb}' used {count} times"),
                points: (count - config.verb_repeat_allowance) as f64 * config.per_verb_repeat,
            });
        }
    }

    for phrase in &config.outdated_sections {
        if lower.contains(phrase.as_str()) {
            penalties.push(Penalty {
                kind: PenaltyKind::OutdatedSection,
                detail: phrase.trim_end_matches(':').to_string(),
                points: config.per_outdated_section,
            });
        }
    }

    let mut phrase_budget = config.phrase_cap;
    let phrase_hits = config
        .buzzwords
        .iter()
        .map(|p| (PenaltyKind::Buzzword, p, config.per_buzzword))
        .chain(
            config
                .weak_phrases
                .iter()
                .map(|p| (PenaltyKind::WeakPhrase, p, config.per_weak_phrase)),
        )
        .filter(|(_, phrase, _)| contains_term(lower, phrase));

    for (kind, phrase, points) in phrase_hits {
        let points = points.min(phrase_budget);
        if points <= 0.0 {
            break;
        }
        phrase_budget -= points;
        penalties.push(Penalty {
            kind,
            detail: phrase.clone(),
            points,
        });
    }

    penalties
}

pub fn total(penalties: &[Penalty]) -> f64 {
    penalties.iter().map(|p| p.points).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbs(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(v, c)| (v.to_string(), *c)).collect()
    }

    #[test]
    fn test_repeated_verbs_cost_per_excess_use() {
        let penalties = assess("", &verbs(&[("led", 5), ("built", 2)]), &PenaltyConfig::default());
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].kind, PenaltyKind::RepeatedVerb);
        assert_eq!(penalties[0].points, 6.0);
    }

    #[test]
    fn test_outdated_sections_each_cost_fixed_amount() {
        let text = "marital status: single\nreferences available upon request";
        let penalties = assess(text, &BTreeMap::new(), &PenaltyConfig::default());
        // "references upon request" is not a substring of the longer phrase.
        assert_eq!(penalties.len(), 2);
        assert_eq!(total(&penalties), 10.0);
    }

    #[test]
    fn test_phrase_penalties_are_capped() {
        let config = PenaltyConfig {
            per_buzzword: 4.0,
            ..Default::default()
        };
        let text = "synergy, team player, hard worker, self-starter. responsible for builds";
        let penalties = assess(text, &BTreeMap::new(), &config);

        assert_eq!(total(&penalties), 10.0);
        assert!(penalties.iter().all(|p| p.kind == PenaltyKind::Buzzword));
    }

    #[test]
    fn test_buzzwords_match_whole_words() {
        // "dynamically" is not the buzzword "dynamic".
        let penalties = assess("dynamically typed", &BTreeMap::new(), &PenaltyConfig::default());
        assert!(penalties.is_empty());
    }
}

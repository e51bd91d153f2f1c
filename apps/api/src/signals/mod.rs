//! Signal Extraction — turns a résumé analysis into normalized, categorized keywords
//! and a priority-ordered search query.

pub mod categories;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::resume::ResumeAnalysis;
pub use categories::{CategoryTables, SkillCategory};

/// A normalized keyword and the category it was classified into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub term: String,
    pub category: SkillCategory,
}

/// Output of signal extraction. `keywords` keeps first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSignals {
    pub keywords: Vec<Keyword>,
    pub query: String,
}

impl ExtractedSignals {
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.term.as_str())
    }

    /// Everything that is not a soft skill: technical and domain keywords.
    pub fn technical(&self) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|k| !k.category.is_soft())
            .map(|k| k.term.as_str())
            .collect()
    }

    pub fn soft(&self) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|k| k.category.is_soft())
            .map(|k| k.term.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalExtractor {
    tables: CategoryTables,
}

impl SignalExtractor {
    pub fn new(tables: CategoryTables) -> Self {
        Self { tables }
    }

    /// Extracts de-duplicated keywords from every skill category of the analysis
    /// and builds the search query. Input category labels are not trusted; every
    /// keyword is re-classified against the tables.
    pub fn extract(&self, analysis: &ResumeAnalysis) -> ExtractedSignals {
        let raw = analysis.skills.values().flatten().map(String::as_str);
        let keywords = self.normalize_and_classify(raw);
        let query = self.build_query(&keywords);
        ExtractedSignals { keywords, query }
    }

    /// Classifies a single keyword. Exact membership wins over substring rules;
    /// anything unmatched is `Uncategorized` and kept.
    pub fn classify(&self, keyword: &str) -> SkillCategory {
        let keyword = keyword.trim().to_lowercase();

        for (category, term) in self.tables.all_terms() {
            if term == keyword {
                return category;
            }
        }

        for (category, term) in self.tables.all_terms() {
            if term.len() >= 3 && contains_term(&keyword, term) {
                return category;
            }
        }

        SkillCategory::Uncategorized
    }

    /// Groups raw keywords by category name (used when migrating flat skill lists).
    pub fn categorize(&self, keywords: &[String]) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for keyword in self.normalize_and_classify(keywords.iter().map(String::as_str)) {
            grouped
                .entry(keyword.category.as_str().to_string())
                .or_default()
                .push(keyword.term);
        }
        grouped
    }

    /// Known skill terms mentioned anywhere in free text.
    ///
    /// One- and two-letter alphanumeric terms ("r", "go", "ai") are skipped here:
    /// in prose they match ordinary words far more often than skills.
    pub fn detect_in_text(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (_, term) in self.tables.all_terms() {
            let eligible = term.len() >= 3 || term.chars().any(|c| !c.is_alphanumeric());
            if eligible && contains_term(&text, term) && seen.insert(term.to_string()) {
                found.push(term.to_string());
            }
        }

        found
    }

    fn normalize_and_classify<'a>(&self, raw: impl Iterator<Item = &'a str>) -> Vec<Keyword> {
        let mut seen = HashSet::new();
        raw.map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.clone()))
            .map(|term| Keyword {
                category: self.classify(&term),
                term,
            })
            .collect()
    }

    fn build_query(&self, keywords: &[Keyword]) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for category in SkillCategory::QUERY_ORDER {
            let in_category = keywords
                .iter()
                .filter(|k| k.category == category)
                .map(|k| k.term.as_str());

            if category.is_soft() {
                parts.extend(in_category.take(self.tables.soft_skill_limit));
            } else {
                parts.extend(in_category);
            }
        }

        parts.truncate(self.tables.max_query_terms);

        if parts.is_empty() {
            // Providers reject empty queries.
            return self.tables.default_query.clone();
        }
        parts.join(" ")
    }
}

/// Case-sensitive containment of `term` in `haystack` on word boundaries.
/// Callers lower-case both sides.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

//! Rule-based match score, used when the scoring oracle is unavailable.
//!
//! score = 40·technical ratio + 15·soft ratio + 20·(ats/100) + freshness + 10·salary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::JobPosting;
use crate::models::recommendation::{MatchLevel, MatchResult};
use crate::signals::{contains_term, ExtractedSignals};

pub const METHODOLOGY_RULES: &str = "rule-based";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessBand {
    pub max_age_days: i64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankingConfig {
    pub technical_points: f64,
    pub soft_points: f64,
    pub ats_points: f64,
    pub salary_points: f64,
    /// Ascending by age; the first band containing the posting's age applies.
    pub freshness_bands: Vec<FreshnessBand>,
    pub technical_ratio_cap: usize,
    pub soft_ratio_cap: usize,
    pub recent_callout_days: i64,
    pub max_results: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            technical_points: 40.0,
            soft_points: 15.0,
            ats_points: 20.0,
            salary_points: 10.0,
            freshness_bands: vec![
                FreshnessBand { max_age_days: 7, points: 15.0 },
                FreshnessBand { max_age_days: 14, points: 10.0 },
                FreshnessBand { max_age_days: 30, points: 5.0 },
            ],
            technical_ratio_cap: 10,
            soft_ratio_cap: 5,
            recent_callout_days: 3,
            max_results: 20,
        }
    }
}

impl RankingConfig {
    pub fn freshness_points(&self, age_days: i64) -> f64 {
        self.freshness_bands
            .iter()
            .find(|b| age_days <= b.max_age_days)
            .map_or(0.0, |b| b.points)
    }
}

/// Share of `skills` found in `text`, against a denominator capped at `cap`.
fn matched_ratio<'a>(skills: &[&'a str], text: &str, cap: usize) -> (f64, Vec<&'a str>) {
    let matched: Vec<&str> = skills
        .iter()
        .copied()
        .filter(|s| contains_term(text, s))
        .collect();
    let denominator = skills.len().min(cap);
    if denominator == 0 {
        return (0.0, matched);
    }
    ((matched.len() as f64 / denominator as f64).min(1.0), matched)
}

pub fn score_posting(
    posting: &JobPosting,
    signals: &ExtractedSignals,
    ats_score: f64,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> MatchResult {
    let text = posting.search_text();
    let (technical_ratio, technical) =
        matched_ratio(&signals.technical(), &text, config.technical_ratio_cap);
    let (soft_ratio, soft) = matched_ratio(&signals.soft(), &text, config.soft_ratio_cap);
    let age = posting.age_days(now);

    let raw = config.technical_points * technical_ratio
        + config.soft_points * soft_ratio
        + config.ats_points * (ats_score.clamp(0.0, 100.0) / 100.0)
        + config.freshness_points(age)
        + if posting.has_salary() { config.salary_points } else { 0.0 };
    let score = ((raw.clamp(0.0, 100.0)) * 10.0).round() / 10.0;

    let mut reasons = Vec::new();
    if !technical.is_empty() {
        reasons.push(format!(
            "Matching skills: {}",
            technical.iter().take(5).copied().collect::<Vec<_>>().join(", ")
        ));
    }
    if !soft.is_empty() {
        reasons.push(format!("Soft skills valued: {}", soft.join(", ")));
    }
    reasons.push(
        match score {
            s if s >= 80.0 => "Excellent match for your profile",
            s if s >= 60.0 => "Good match, worth applying",
            _ => "Moderate match, review the requirements carefully",
        }
        .to_string(),
    );
    if age <= config.recent_callout_days {
        reasons.push(match age {
            0 => "Posted today".to_string(),
            1 => "Posted yesterday".to_string(),
            n => format!("Posted {n} days ago"),
        });
    }
    if posting.has_salary() {
        reasons.push(format!("Salary listed: {}", posting.salary));
    }

    MatchResult {
        posting: posting.clone(),
        match_score: score,
        semantic_similarity: None,
        match_level: MatchLevel::from_score(score),
        reasons,
        methodology: METHODOLOGY_RULES.to_string(),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::job::JobPosting;

/// Qualitative tier attached to a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchLevel {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl MatchLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => MatchLevel::Excellent,
            s if s >= 65.0 => MatchLevel::VeryGood,
            s if s >= 50.0 => MatchLevel::Good,
            s if s >= 35.0 => MatchLevel::Fair,
            _ => MatchLevel::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchLevel::Excellent => "excellent",
            MatchLevel::VeryGood => "very-good",
            MatchLevel::Good => "good",
            MatchLevel::Fair => "fair",
            MatchLevel::Poor => "poor",
        }
    }

    /// Accepts the stored form as well as labels like "Very Good".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(' ', "-").as_str() {
            "excellent" => Some(MatchLevel::Excellent),
            "very-good" => Some(MatchLevel::VeryGood),
            "good" => Some(MatchLevel::Good),
            "fair" => Some(MatchLevel::Fair),
            "poor" => Some(MatchLevel::Poor),
            _ => None,
        }
    }
}

/// A scored posting. Ephemeral; persisted only through the recommendation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub posting: JobPosting,
    pub match_score: f64, // 0 – 100
    pub semantic_similarity: Option<f64>, // 0.0 – 1.0
    pub match_level: MatchLevel,
    pub reasons: Vec<String>,
    pub methodology: String,
}

/// Ordered matches for a user (and résumé, when the set was read for one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub user_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub matches: Vec<MatchResult>,
    pub generated_at: DateTime<Utc>,
}

/// Caller-supplied ranking constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankFilters {
    pub location: Option<String>,
    pub keywords: Option<String>,
    pub days_posted: Option<u32>,
    pub min_match_score: Option<f64>,
}

/// Join of `job_recommendations` and `job_postings`.
#[derive(Debug, Clone, FromRow)]
pub struct StoredRecommendationRow {
    pub match_score: f64,
    pub semantic_similarity: Option<f64>,
    pub reasons: Vec<String>,
    pub methodology: String,
    pub match_level: Option<String>,
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub snippet: String,
    pub salary: String,
    pub job_type: String,
    pub posted_at: DateTime<Utc>,
}

impl From<StoredRecommendationRow> for MatchResult {
    fn from(row: StoredRecommendationRow) -> Self {
        MatchResult {
            match_level: row
                .match_level
                .as_deref()
                .and_then(MatchLevel::parse)
                .unwrap_or_else(|| MatchLevel::from_score(row.match_score)),
            match_score: row.match_score,
            semantic_similarity: row.semantic_similarity,
            reasons: row.reasons,
            methodology: row.methodology,
            posting: JobPosting {
                title: row.title,
                company: row.company,
                location: row.location,
                snippet: row.snippet,
                salary: row.salary,
                job_type: row.job_type,
                posted_at: row.posted_at,
                url: row.url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_level_bands() {
        assert_eq!(MatchLevel::from_score(95.0), MatchLevel::Excellent);
        assert_eq!(MatchLevel::from_score(80.0), MatchLevel::Excellent);
        assert_eq!(MatchLevel::from_score(79.9), MatchLevel::VeryGood);
        assert_eq!(MatchLevel::from_score(50.0), MatchLevel::Good);
        assert_eq!(MatchLevel::from_score(35.0), MatchLevel::Fair);
        assert_eq!(MatchLevel::from_score(0.0), MatchLevel::Poor);
    }

    #[test]
    fn test_match_level_serializes_kebab_case() {
        let value = serde_json::to_value(MatchLevel::VeryGood).unwrap();
        assert_eq!(value, "very-good");
    }

    fn stored_row(match_score: f64, match_level: Option<&str>) -> StoredRecommendationRow {
        StoredRecommendationRow {
            match_score,
            semantic_similarity: Some(0.7),
            reasons: vec!["Skills match".to_string()],
            methodology: "semantic".to_string(),
            match_level: match_level.map(str::to_string),
            url: "https://a".to_string(),
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            snippet: "rust".to_string(),
            salary: "Not specified".to_string(),
            job_type: "Full-time".to_string(),
            posted_at: Utc::now(),
        }
    }

    #[test]
    fn test_stored_match_level_is_kept() {
        let result = MatchResult::from(stored_row(70.0, Some("good")));
        assert_eq!(result.match_level, MatchLevel::Good);
        assert_eq!(result.match_score, 70.0);
    }

    #[test]
    fn test_missing_stored_level_falls_back_to_score() {
        assert_eq!(MatchResult::from(stored_row(70.0, None)).match_level, MatchLevel::VeryGood);
        assert_eq!(MatchResult::from(stored_row(20.0, Some("stellar"))).match_level, MatchLevel::Poor);
    }

    #[test]
    fn test_match_level_text_form() {
        for level in [
            MatchLevel::Excellent,
            MatchLevel::VeryGood,
            MatchLevel::Good,
            MatchLevel::Fair,
            MatchLevel::Poor,
        ] {
            assert_eq!(MatchLevel::parse(level.as_str()), Some(level));
            assert_eq!(serde_json::to_value(level).unwrap(), level.as_str());
        }
        assert_eq!(MatchLevel::parse("Very Good"), Some(MatchLevel::VeryGood));
    }
}

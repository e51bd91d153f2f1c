use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ats::extract::analyze_text;
use crate::errors::AppError;
use crate::fallback::with_fallback;
use crate::matching::rules::{score_posting, RankingConfig};
use crate::matching::validation::validate_resume;
use crate::models::job::JobPosting;
use crate::models::recommendation::{MatchLevel, MatchResult, RankFilters};
use crate::models::resume::ResumeAnalysis;
use crate::oracle::{normalize_similarity, BatchMatchRequest, OracleError, OracleJob, ScoringOracle};
use crate::signals::SignalExtractor;

pub const METHODOLOGY_SEMANTIC: &str = "semantic";

/// Scores postings against a résumé: one batch call to the scoring oracle,
/// falling back to the rule formula per posting.
pub struct MatchRanker {
    oracle: Arc<dyn ScoringOracle>,
    extractor: Arc<SignalExtractor>,
    config: RankingConfig,
    timeout: Duration,
}

impl MatchRanker {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        extractor: Arc<SignalExtractor>,
        config: RankingConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            extractor,
            config,
            timeout,
        }
    }

    pub async fn rank(
        &self,
        postings: Vec<JobPosting>,
        analysis: &ResumeAnalysis,
        filters: &RankFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, AppError> {
        validate_resume(analysis)?;

        if postings.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = postings.as_slice();
        let outcome = with_fallback(
            "match-oracle",
            self.timeout,
            self.semantic(candidates, analysis),
            move |_| async move { self.rule_based(candidates, analysis, now) },
        )
        .await;

        let degraded = outcome.degradation().is_some();
        let scored = outcome.into_inner();
        let ranked = post_process(scored, filters, now, self.config.max_results);

        info!(
            candidates = postings.len(),
            returned = ranked.len(),
            degraded,
            "Postings ranked"
        );
        Ok(ranked)
    }

    async fn semantic(
        &self,
        postings: &[JobPosting],
        analysis: &ResumeAnalysis,
    ) -> Result<Vec<MatchResult>, OracleError> {
        // Payloads without a declared level or tenure get the values detected in the text.
        let (experience_level, years_of_experience) =
            match (analysis.experience_level, analysis.years_of_experience) {
                (Some(level), Some(years)) => (level, years),
                (level, years) => {
                    let detected = analyze_text(&analysis.extracted_text, &self.extractor);
                    (
                        level.unwrap_or(detected.detected_level),
                        years.unwrap_or(detected.years_of_experience),
                    )
                }
            };

        let request = BatchMatchRequest {
            resume_text: analysis.extracted_text.clone(),
            jobs: postings
                .iter()
                .map(|p| OracleJob {
                    title: p.title.clone(),
                    description: p.snippet.clone(),
                })
                .collect(),
            ats_score: analysis.score,
            experience_level,
            years_of_experience,
        };

        let response = self.oracle.batch_match(&request).await?;

        if !response.success {
            return Err(OracleError::Malformed("success flag not set".to_string()));
        }
        if response.matches.len() != postings.len() {
            return Err(OracleError::Malformed(format!(
                "expected {} matches, got {}",
                postings.len(),
                response.matches.len()
            )));
        }
        if response.matches.iter().any(|m| !m.match_score.is_finite()) {
            return Err(OracleError::Malformed("non-finite match score".to_string()));
        }

        debug!(matches = response.matches.len(), "Oracle batch match accepted");

        Ok(postings
            .iter()
            .zip(response.matches)
            .map(|(posting, m)| {
                let score = m.match_score.clamp(0.0, 100.0);
                MatchResult {
                    posting: posting.clone(),
                    match_score: score,
                    semantic_similarity: m.semantic_similarity.map(normalize_similarity),
                    match_level: m
                        .match_level
                        .as_deref()
                        .and_then(MatchLevel::parse)
                        .unwrap_or_else(|| MatchLevel::from_score(score)),
                    reasons: m.reasons,
                    methodology: m
                        .methodology
                        .unwrap_or_else(|| METHODOLOGY_SEMANTIC.to_string()),
                }
            })
            .collect())
    }

    fn rule_based(
        &self,
        postings: &[JobPosting],
        analysis: &ResumeAnalysis,
        now: DateTime<Utc>,
    ) -> Vec<MatchResult> {
        let signals = self.extractor.extract(analysis);
        postings
            .iter()
            .map(|p| score_posting(p, &signals, analysis.score, now, &self.config))
            .collect()
    }
}

/// Applies the score and age filters, sorts by score (newest first on ties)
/// and truncates.
pub fn post_process(
    mut matches: Vec<MatchResult>,
    filters: &RankFilters,
    now: DateTime<Utc>,
    max_results: usize,
) -> Vec<MatchResult> {
    if let Some(min) = filters.min_match_score {
        matches.retain(|m| m.match_score >= min);
    }
    if let Some(days) = filters.days_posted {
        matches.retain(|m| m.posting.age_days(now) <= days as i64);
    }

    matches.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| b.posting.posted_at.cmp(&a.posting.posted_at))
    });
    matches.truncate(max_results);
    matches
}

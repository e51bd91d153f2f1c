//! Recommendation Store — all-or-nothing replacement of a résumé's match set,
//! and read-back of a user's stored matches.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::recommendation::{MatchResult, StoredRecommendationRow};

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Replaces every stored match for `(user_id, resume_id)` with `matches`.
    /// Either the whole set is visible afterwards or nothing changed.
    async fn replace(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        matches: &[MatchResult],
    ) -> Result<(), AppError>;

    /// Stored matches across the user's résumés, best score first, then newest posting.
    async fn get_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<MatchResult>, AppError>;
}

fn order_matches(matches: &mut [MatchResult]) {
    matches.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| b.posting.posted_at.cmp(&a.posting.posted_at))
    });
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgRecommendationStore {
    db: PgPool,
}

impl PgRecommendationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn replace_in(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        resume_id: Uuid,
        matches: &[MatchResult],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM job_recommendations WHERE user_id = $1 AND resume_id = $2")
            .bind(user_id)
            .bind(resume_id)
            .execute(&mut **tx)
            .await?;

        for (rank, m) in matches.iter().enumerate() {
            let posting = &m.posting;

            // Insert-if-absent; the no-op update makes RETURNING yield the existing id.
            let job_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO job_postings
                    (url, title, company, location, snippet, salary, job_type, posted_at, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
                ON CONFLICT (url) DO UPDATE SET url = EXCLUDED.url
                RETURNING id
                "#,
            )
            .bind(&posting.url)
            .bind(&posting.title)
            .bind(&posting.company)
            .bind(&posting.location)
            .bind(&posting.snippet)
            .bind(&posting.salary)
            .bind(&posting.job_type)
            .bind(posting.posted_at)
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO job_recommendations
                    (user_id, resume_id, job_id, match_score, semantic_similarity,
                     reasons, methodology, match_level, rank)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (user_id, resume_id, job_id) DO UPDATE SET
                    match_score         = EXCLUDED.match_score,
                    semantic_similarity = EXCLUDED.semantic_similarity,
                    reasons             = EXCLUDED.reasons,
                    methodology         = EXCLUDED.methodology,
                    match_level         = EXCLUDED.match_level,
                    rank                = EXCLUDED.rank
                "#,
            )
            .bind(user_id)
            .bind(resume_id)
            .bind(job_id)
            .bind(m.match_score)
            .bind(m.semantic_similarity)
            .bind(&m.reasons)
            .bind(&m.methodology)
            .bind(m.match_level.as_str())
            .bind(rank as i32)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn replace(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        matches: &[MatchResult],
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        if let Err(e) = Self::replace_in(&mut tx, user_id, resume_id, matches).await {
            error!(%user_id, %resume_id, error = %e, "Recommendation replace failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "Rollback failed");
            }
            return Err(AppError::Transaction(e.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))?;

        info!(%user_id, %resume_id, count = matches.len(), "Recommendations stored");
        Ok(())
    }

    async fn get_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<MatchResult>, AppError> {
        let rows = sqlx::query_as::<_, StoredRecommendationRow>(
            r#"
            SELECT r.match_score, r.semantic_similarity, r.reasons, r.methodology, r.match_level,
                   p.url, p.title, p.company, p.location, p.snippet, p.salary,
                   p.job_type, p.posted_at
            FROM job_recommendations r
            JOIN job_postings p ON p.id = r.job_id
            WHERE r.user_id = $1
            ORDER BY r.match_score DESC, p.posted_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(MatchResult::from).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRecommendationStore {
    sets: RwLock<HashMap<(Uuid, Uuid), Vec<MatchResult>>>,
}

impl MemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationStore for MemoryRecommendationStore {
    async fn replace(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        matches: &[MatchResult],
    ) -> Result<(), AppError> {
        // One entry per URL, last write wins, as with the unique key in Postgres.
        let mut by_url: Vec<MatchResult> = Vec::with_capacity(matches.len());
        for m in matches {
            match by_url.iter_mut().find(|e| e.posting.url == m.posting.url) {
                Some(existing) => *existing = m.clone(),
                None => by_url.push(m.clone()),
            }
        }

        self.sets
            .write()
            .await
            .insert((user_id, resume_id), by_url);
        Ok(())
    }

    async fn get_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<MatchResult>, AppError> {
        let sets = self.sets.read().await;
        let mut matches: Vec<MatchResult> = sets
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .flat_map(|(_, set)| set.iter().cloned())
            .collect();
        order_matches(&mut matches);
        matches.truncate(limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::posting;
    use crate::models::recommendation::MatchLevel;

    fn scored(url: &str, score: f64, age_days: i64) -> MatchResult {
        MatchResult {
            posting: posting(url, "Dev", "", age_days),
            match_score: score,
            semantic_similarity: None,
            match_level: MatchLevel::from_score(score),
            reasons: vec![format!("score {score}")],
            methodology: "rule-based".to_string(),
        }
    }

    #[tokio::test]
    async fn test_replace_then_get_round_trip() {
        let store = MemoryRecommendationStore::new();
        let user = Uuid::new_v4();
        let written = vec![scored("https://a", 91.0, 3), scored("https://b", 72.5, 1), scored("https://c", 40.0, 9)];

        store.replace(user, Uuid::new_v4(), &written).await.unwrap();
        let read = store.get_for_user(user, 20).await.unwrap();

        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_set() {
        let store = MemoryRecommendationStore::new();
        let (user, resume) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .replace(user, resume, &[scored("https://old", 99.0, 0)])
            .await
            .unwrap();
        store
            .replace(user, resume, &[scored("https://new", 60.0, 0)])
            .await
            .unwrap();

        let read = store.get_for_user(user, 20).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].posting.url, "https://new");
    }

    #[tokio::test]
    async fn test_get_for_user_merges_resumes_and_limits() {
        let store = MemoryRecommendationStore::new();
        let user = Uuid::new_v4();
        store
            .replace(user, Uuid::new_v4(), &[scored("https://a", 50.0, 0), scored("https://b", 80.0, 0)])
            .await
            .unwrap();
        store
            .replace(user, Uuid::new_v4(), &[scored("https://c", 70.0, 5), scored("https://d", 70.0, 1)])
            .await
            .unwrap();
        store
            .replace(Uuid::new_v4(), Uuid::new_v4(), &[scored("https://x", 100.0, 0)])
            .await
            .unwrap();

        let read = store.get_for_user(user, 3).await.unwrap();
        let urls: Vec<&str> = read.iter().map(|m| m.posting.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b", "https://d", "https://c"]);
    }
}

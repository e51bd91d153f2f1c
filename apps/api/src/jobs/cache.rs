//! Persistent posting cache. Postings are keyed by URL; an upsert refreshes the
//! descriptive fields and re-activates the row.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::job::{JobPosting, JobPostingRow};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Cache filter. Keyword terms match title or snippet, any term suffices;
/// `location` is a substring match. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheQuery {
    pub terms: Vec<String>,
    pub location: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl CacheQuery {
    pub fn new(keywords: &str, location: Option<&str>, limit: usize, page: u32) -> Self {
        Self {
            terms: query_terms(keywords),
            location: location
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty()),
            limit,
            offset: limit * page.saturating_sub(1) as usize,
        }
    }

    pub fn matches(&self, posting: &JobPosting) -> bool {
        let keyword_ok = self.terms.is_empty() || {
            let haystack = posting.search_text();
            self.terms.iter().any(|t| haystack.contains(t.as_str()))
        };
        let location_ok = self
            .location
            .as_ref()
            .map_or(true, |l| posting.location.to_lowercase().contains(l.as_str()));
        keyword_ok && location_ok
    }
}

/// Lower-cased, de-duplicated search terms. Separators are whitespace and commas.
pub fn query_terms(keywords: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[async_trait]
pub trait JobCache: Send + Sync {
    /// Inserts new postings and refreshes existing ones, all or nothing.
    async fn upsert_many(&self, postings: &[JobPosting]) -> Result<usize, CacheError>;

    async fn search(&self, query: &CacheQuery) -> Result<Vec<JobPosting>, CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgJobCache {
    db: PgPool,
}

impl PgJobCache {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl JobCache for PgJobCache {
    async fn upsert_many(&self, postings: &[JobPosting]) -> Result<usize, CacheError> {
        if postings.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        for posting in postings {
            sqlx::query(
                r#"
                INSERT INTO job_postings
                    (url, title, company, location, snippet, salary, job_type, posted_at, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
                ON CONFLICT (url) DO UPDATE SET
                    title      = EXCLUDED.title,
                    company    = EXCLUDED.company,
                    location   = EXCLUDED.location,
                    snippet    = EXCLUDED.snippet,
                    salary     = EXCLUDED.salary,
                    job_type   = EXCLUDED.job_type,
                    posted_at  = EXCLUDED.posted_at,
                    is_active  = TRUE,
                    updated_at = NOW()
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
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(postings.len())
    }

    async fn search(&self, query: &CacheQuery) -> Result<Vec<JobPosting>, CacheError> {
        let patterns: Vec<String> = query.terms.iter().map(|t| like_pattern(t)).collect();
        let location = query.location.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, JobPostingRow>(
            r#"
            SELECT url, title, company, location, snippet, salary, job_type, posted_at
            FROM job_postings
            WHERE is_active
              AND (cardinality($1::text[]) = 0
                   OR title ILIKE ANY($1::text[])
                   OR snippet ILIKE ANY($1::text[]))
              AND ($2::text IS NULL OR location ILIKE $2)
            ORDER BY posted_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&patterns)
        .bind(location)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(JobPosting::from).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Same semantics as `PgJobCache`, without persistence. Used when no database
/// is configured and in tests.
#[derive(Default)]
pub struct MemoryJobCache {
    postings: RwLock<Vec<JobPosting>>,
}

impl MemoryJobCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.postings.read().await.len()
    }
}

#[async_trait]
impl JobCache for MemoryJobCache {
    async fn upsert_many(&self, postings: &[JobPosting]) -> Result<usize, CacheError> {
        let mut stored = self.postings.write().await;
        for posting in postings {
            match stored.iter_mut().find(|p| p.url == posting.url) {
                Some(existing) => *existing = posting.clone(),
                None => stored.push(posting.clone()),
            }
        }
        Ok(postings.len())
    }

    async fn search(&self, query: &CacheQuery) -> Result<Vec<JobPosting>, CacheError> {
        let stored = self.postings.read().await;
        let mut found: Vec<JobPosting> = stored.iter().filter(|p| query.matches(p)).cloned().collect();
        found.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(found.into_iter().skip(query.offset).take(query.limit).collect())
    }
}

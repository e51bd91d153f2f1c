//! The four public operations: score a résumé, rank jobs for a résumé, warm the
//! posting cache, read stored recommendations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ats::{AtsResult, AtsScorer};
use crate::errors::AppError;
use crate::jobs::dedup::dedupe;
use crate::jobs::{BudgetStatus, JobSource};
use crate::matching::validation::validate_resume;
use crate::matching::MatchRanker;
use crate::models::recommendation::{RankFilters, RecommendationSet};
use crate::models::resume::{AnalysisPayload, ExperienceLevel};
use crate::recommendations::RecommendationStore;
use crate::signals::SignalExtractor;

pub struct RecommendationService {
    extractor: Arc<SignalExtractor>,
    ats: AtsScorer,
    jobs: JobSource,
    ranker: MatchRanker,
    store: Arc<dyn RecommendationStore>,
    pipeline_timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        extractor: Arc<SignalExtractor>,
        ats: AtsScorer,
        jobs: JobSource,
        ranker: MatchRanker,
        store: Arc<dyn RecommendationStore>,
        pipeline_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            ats,
            jobs,
            ranker,
            store,
            pipeline_timeout,
        }
    }

    /// Scores at `level`, or at the level detected in the text when `None`.
    pub async fn score_resume(&self, text: &str, level: Option<ExperienceLevel>) -> AtsResult {
        self.ats.score(text, level).await
    }

    /// Validates the analysis, searches live and cached postings, ranks them and
    /// replaces the stored set for `(user_id, resume_id)`.
    pub async fn rank_jobs(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        payload: AnalysisPayload,
        filters: RankFilters,
    ) -> Result<RecommendationSet, AppError> {
        let work = self.rank_jobs_inner(user_id, resume_id, payload, filters);
        match tokio::time::timeout(self.pipeline_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%user_id, %resume_id, "Recommendation pipeline timed out");
                Err(AppError::Upstream(format!(
                    "Recommendation pipeline exceeded {}s",
                    self.pipeline_timeout.as_secs()
                )))
            }
        }
    }

    async fn rank_jobs_inner(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        payload: AnalysisPayload,
        filters: RankFilters,
    ) -> Result<RecommendationSet, AppError> {
        if payload.is_outdated() {
            info!(%resume_id, "Résumé analysis uses an outdated schema and should be re-analyzed");
        }
        let analysis = payload.normalize(&self.extractor);

        // Reject non-résumés before spending provider budget.
        validate_resume(&analysis)?;

        let signals = self.extractor.extract(&analysis);
        let query = match filters.keywords.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{extra} {}", signals.query),
            _ => signals.query.clone(),
        };
        debug!(
            keywords = ?signals.terms().collect::<Vec<_>>(),
            query = %query,
            "Search signals extracted"
        );
        let location = filters.location.as_deref().map(str::trim).filter(|l| !l.is_empty());

        let live = self.jobs.search(&query, location, 1).await;
        let api_calls_used = live.api_calls_used;
        let candidates = if live.from_cache {
            live.postings
        } else {
            let cached = self.jobs.cached(&query, location, 1).await;
            dedupe([live.postings, cached.postings])
        };

        let now = Utc::now();
        let matches = self.ranker.rank(candidates, &analysis, &filters, now).await?;

        self.store.replace(user_id, resume_id, &matches).await?;

        info!(
            %user_id,
            %resume_id,
            query = %query,
            matches = matches.len(),
            api_calls_used,
            "Recommendations generated"
        );

        Ok(RecommendationSet {
            user_id,
            resume_id: Some(resume_id),
            matches,
            generated_at: now,
        })
    }

    pub async fn refresh_cache(&self, query: &str, location: Option<&str>) -> Result<(), AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }
        self.jobs.refresh(query, location).await;
        Ok(())
    }

    pub async fn stored_recommendations(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<RecommendationSet, AppError> {
        let matches = self.store.get_for_user(user_id, limit).await?;
        Ok(RecommendationSet {
            user_id,
            resume_id: None,
            matches,
            generated_at: Utc::now(),
        })
    }

    pub fn budget_status(&self) -> BudgetStatus {
        self.jobs.budget_status()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::ats::rules::AtsConfig;
    use crate::jobs::cache::{CacheError, CacheQuery, JobCache, MemoryJobCache};
    use crate::jobs::source::tests::{Behavior, FakeProvider};
    use crate::jobs::ApiBudget;
    use crate::matching::RankingConfig;
    use crate::models::job::{posting, JobPosting};
    use crate::models::recommendation::MatchResult;
    use crate::oracle::{BatchMatchRequest, BatchMatchResponse, OracleError, ScoringOracle};
    use crate::recommendations::MemoryRecommendationStore;

    pub(crate) struct DownOracle;

    #[async_trait]
    impl ScoringOracle for DownOracle {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
            Err(OracleError::Unavailable { retries: 2 })
        }

        async fn batch_match(
            &self,
            _request: &BatchMatchRequest,
        ) -> Result<BatchMatchResponse, OracleError> {
            Err(OracleError::Unavailable { retries: 2 })
        }
    }

    /// Rejects every write, as a failed transaction would.
    struct FailingStore;

    #[async_trait]
    impl RecommendationStore for FailingStore {
        async fn replace(
            &self,
            _user_id: Uuid,
            _resume_id: Uuid,
            _matches: &[MatchResult],
        ) -> Result<(), AppError> {
            Err(AppError::Transaction("deadlock detected".to_string()))
        }

        async fn get_for_user(
            &self,
            _user_id: Uuid,
            _limit: usize,
        ) -> Result<Vec<MatchResult>, AppError> {
            Ok(Vec::new())
        }
    }

    /// Memory cache that counts searches.
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryJobCache,
        searches: AtomicU32,
    }

    #[async_trait]
    impl JobCache for CountingCache {
        async fn upsert_many(&self, postings: &[JobPosting]) -> Result<usize, CacheError> {
            self.inner.upsert_many(postings).await
        }

        async fn search(&self, query: &CacheQuery) -> Result<Vec<JobPosting>, CacheError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.inner.search(query).await
        }
    }

    pub(crate) fn service_with(
        provider: Arc<FakeProvider>,
        cache: Arc<dyn JobCache>,
        store: Arc<dyn RecommendationStore>,
    ) -> RecommendationService {
        let extractor = Arc::new(SignalExtractor::default());
        let oracle: Arc<dyn ScoringOracle> = Arc::new(DownOracle);
        RecommendationService::new(
            extractor.clone(),
            AtsScorer::new(
                oracle.clone(),
                extractor.clone(),
                AtsConfig::default(),
                Duration::from_secs(30),
            ),
            JobSource::new(
                provider,
                cache,
                ApiBudget::new(10),
                Duration::from_secs(10),
                50,
            ),
            MatchRanker::new(oracle, extractor, RankingConfig::default(), Duration::from_secs(30)),
            store,
            Duration::from_secs(60),
        )
    }

    pub(crate) fn valid_payload() -> AnalysisPayload {
        serde_json::from_value(json!({
            "score": 81.0,
            "skills": {"technical": ["python", "react", "aws"]},
            "extractedText": "jane@example.com\nExperience\n- Built APIs\nEducation\nBSc",
            "metrics": {
                "wordCount": 420,
                "sectionsFound": 3,
                "actionVerbCount": 6,
                "quantifiedBulletRatio": 0.3
            }
        }))
        .unwrap()
    }

    fn spec_postings() -> Vec<JobPosting> {
        vec![
            posting("https://a", "Full Stack Developer", "python and react", 2),
            posting("https://b", "Account Executive", "python sales", 60),
        ]
    }

    #[tokio::test]
    async fn test_rank_jobs_end_to_end_with_degraded_oracle() {
        let provider = Arc::new(FakeProvider::new(Behavior::Return(spec_postings())));
        let store = Arc::new(MemoryRecommendationStore::new());
        let service = service_with(provider, Arc::new(MemoryJobCache::new()), store.clone());
        let user = Uuid::new_v4();

        let filters = RankFilters {
            min_match_score: Some(50.0),
            ..Default::default()
        };
        let set = service
            .rank_jobs(user, Uuid::new_v4(), valid_payload(), filters)
            .await
            .unwrap();

        assert_eq!(set.matches.len(), 1);
        assert_eq!(set.matches[0].posting.url, "https://a");
        assert!(set.matches[0].match_score >= 50.0);

        let stored = service.stored_recommendations(user, 20).await.unwrap();
        assert_eq!(stored.matches, set.matches);
        assert_eq!(service.budget_status().used, 1);
    }

    #[tokio::test]
    async fn test_invalid_resume_rejected_before_search() {
        let provider = Arc::new(FakeProvider::new(Behavior::Return(spec_postings())));
        let service = service_with(
            provider.clone(),
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );

        let payload: AnalysisPayload = serde_json::from_value(json!({
            "score": 30.0,
            "skills": {"technical": ["python"]},
            "extractedText": "just some words",
            "metrics": {
                "wordCount": 3,
                "sectionsFound": 0,
                "actionVerbCount": 0,
                "quantifiedBulletRatio": 0.0
            }
        }))
        .unwrap();

        let result = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), payload, RankFilters::default())
            .await;

        assert!(matches!(result, Err(AppError::InvalidResumeFormat(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.budget_status().used, 0);
    }

    #[tokio::test]
    async fn test_live_and_cached_results_are_deduplicated() {
        let cache = Arc::new(MemoryJobCache::new());
        cache
            .upsert_many(&[
                posting("https://a", "Python Developer (cached)", "python", 20),
                posting("https://c", "React Engineer", "react", 1),
            ])
            .await
            .unwrap();
        let provider = Arc::new(FakeProvider::new(Behavior::Return(spec_postings())));
        let service = service_with(provider, cache, Arc::new(MemoryRecommendationStore::new()));

        let set = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), valid_payload(), RankFilters::default())
            .await
            .unwrap();

        let mut urls: Vec<&str> = set.matches.iter().map(|m| m.posting.url.as_str()).collect();
        urls.sort();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        let a = set.matches.iter().find(|m| m.posting.url == "https://a").unwrap();
        assert_eq!(a.posting.title, "Full Stack Developer", "live posting wins");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_single_error() {
        let provider = Arc::new(FakeProvider::new(Behavior::Return(spec_postings())));
        let service = service_with(provider, Arc::new(MemoryJobCache::new()), Arc::new(FailingStore));

        let result = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), valid_payload(), RankFilters::default())
            .await;
        assert!(matches!(result, Err(AppError::Transaction(_))));
    }

    #[tokio::test]
    async fn test_pipeline_timeout_fails_fast() {
        tokio::time::pause();
        let provider = Arc::new(FakeProvider::new(Behavior::Hang));
        let mut service = service_with(
            provider,
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );
        service.pipeline_timeout = Duration::from_secs(5);

        let result = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), valid_payload(), RankFilters::default())
            .await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_v1_payload_is_accepted() {
        let provider = Arc::new(FakeProvider::new(Behavior::Fail));
        let service = service_with(
            provider,
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );
        let payload: AnalysisPayload = serde_json::from_value(json!({
            "score": 70.0,
            "skills": ["python", "sql", "docker"],
            "extractedText": "sam@example.com\nExperience\n- Shipped 3 services\nEducation\nBSc"
        }))
        .unwrap();

        let set = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), payload, RankFilters::default())
            .await
            .unwrap();
        assert!(set.matches.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_requires_query() {
        let provider = Arc::new(FakeProvider::new(Behavior::Fail));
        let service = service_with(
            provider,
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );
        assert!(matches!(
            service.refresh_cache("  ", None).await,
            Err(AppError::Validation(_))
        ));
        assert!(service.refresh_cache("rust", Some("Berlin")).await.is_ok());
    }

    #[tokio::test]
    async fn test_score_resume_degrades_without_oracle() {
        let provider = Arc::new(FakeProvider::new(Behavior::Fail));
        let service = service_with(
            provider,
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );
        let result = service.score_resume("", Some(ExperienceLevel::Senior)).await;
        assert_eq!(result.methodology, crate::ats::METHODOLOGY_RULES);
        assert!((0.0..=100.0).contains(&result.score));
    }

    #[tokio::test]
    async fn test_cache_queried_once_when_provider_fails() {
        let cache = Arc::new(CountingCache::default());
        cache
            .upsert_many(&[posting("https://cached", "Python Developer", "python", 3)])
            .await
            .unwrap();
        let provider = Arc::new(FakeProvider::new(Behavior::Fail));
        let service = service_with(provider, cache.clone(), Arc::new(MemoryRecommendationStore::new()));

        let set = service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), valid_payload(), RankFilters::default())
            .await
            .unwrap();
        assert_eq!(set.matches.len(), 1);
        assert_eq!(cache.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_merged_after_live_success() {
        let cache = Arc::new(CountingCache::default());
        let provider = Arc::new(FakeProvider::new(Behavior::Return(spec_postings())));
        let service = service_with(provider, cache.clone(), Arc::new(MemoryRecommendationStore::new()));

        service
            .rank_jobs(Uuid::new_v4(), Uuid::new_v4(), valid_payload(), RankFilters::default())
            .await
            .unwrap();
        assert_eq!(cache.searches.load(Ordering::SeqCst), 1);
    }
}

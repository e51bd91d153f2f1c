use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::fallback::with_fallback;
use crate::jobs::budget::{ApiBudget, BudgetStatus};
use crate::jobs::cache::{CacheQuery, JobCache};
use crate::jobs::provider::{JobProvider, ProviderPage};
use crate::models::job::JobPosting;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearchResult {
    pub total_count: u64,
    pub postings: Vec<JobPosting>,
    pub api_calls_used: u32,
    /// Set when the postings came from the cache rather than the provider.
    #[serde(skip)]
    pub from_cache: bool,
}

/// Live provider in front of the posting cache, under a process-wide call budget.
///
/// `search` never fails: provider problems and an exhausted budget are served
/// from the cache, and a cache failure yields an empty result.
pub struct JobSource {
    provider: Arc<dyn JobProvider>,
    cache: Arc<dyn JobCache>,
    budget: ApiBudget,
    timeout: Duration,
    cache_limit: usize,
}

impl JobSource {
    pub fn new(
        provider: Arc<dyn JobProvider>,
        cache: Arc<dyn JobCache>,
        budget: ApiBudget,
        timeout: Duration,
        cache_limit: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            budget,
            timeout,
            cache_limit,
        }
    }

    pub async fn search(&self, query: &str, location: Option<&str>, page: u32) -> JobSearchResult {
        let Some(permit) = self.budget.try_reserve() else {
            info!(
                used = self.budget.used(),
                limit = self.budget.limit(),
                "Provider budget exhausted, serving from cache"
            );
            return self.cached(query, location, page).await;
        };

        // Only the provider call is under the deadline; caching a fetched page is not.
        let fetched = with_fallback(
            "job-provider",
            self.timeout,
            async { self.provider.fetch(query, location, page).await.map(Some) },
            |_| async { None::<ProviderPage> },
        )
        .await
        .into_inner();

        let Some(fetched) = fetched else {
            drop(permit);
            return self.cached(query, location, page).await;
        };
        let used = permit.commit();

        if let Err(e) = self.cache.upsert_many(&fetched.postings).await {
            error!(error = %e, "Failed to cache provider postings");
        }

        info!(
            postings = fetched.postings.len(),
            api_calls_used = used,
            "Provider search succeeded"
        );
        JobSearchResult {
            total_count: fetched.total_count,
            postings: fetched.postings,
            api_calls_used: used,
            from_cache: false,
        }
    }

    /// Cache warm-up: a search whose result is discarded.
    pub async fn refresh(&self, query: &str, location: Option<&str>) {
        let result = self.search(query, location, 1).await;
        info!(
            query,
            postings = result.postings.len(),
            "Job cache refreshed"
        );
    }

    /// Cache-filtered postings, newest first, capped at the cache row limit.
    pub async fn cached(&self, query: &str, location: Option<&str>, page: u32) -> JobSearchResult {
        let cache_query = CacheQuery::new(query, location, self.cache_limit, page);
        match self.cache.search(&cache_query).await {
            Ok(postings) => JobSearchResult {
                total_count: postings.len() as u64,
                postings,
                api_calls_used: self.budget.used(),
                from_cache: true,
            },
            Err(e) => {
                error!(error = %e, "Cache query failed, returning empty result");
                JobSearchResult {
                    api_calls_used: self.budget.used(),
                    from_cache: true,
                    ..Default::default()
                }
            }
        }
    }

    pub fn budget_status(&self) -> BudgetStatus {
        let status = self.budget.status();
        if status.exhausted {
            warn!(used = status.used, limit = status.limit, "Provider budget exhausted");
        }
        status
    }
}

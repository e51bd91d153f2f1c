mod ats;
mod config;
mod db;
mod errors;
mod fallback;
mod jobs;
mod matching;
mod models;
mod oracle;
mod pipeline;
mod recommendations;
mod routes;
mod signals;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::ats::AtsScorer;
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::jobs::{
    ApiBudget, HttpJobProvider, JobCache, JobSource, MemoryJobCache, PgJobCache,
};
use crate::matching::MatchRanker;
use crate::oracle::{HttpScoringOracle, ScoringOracle};
use crate::pipeline::RecommendationService;
use crate::recommendations::{
    MemoryRecommendationStore, PgRecommendationStore, RecommendationStore,
};
use crate::routes::build_router;
use crate::signals::SignalExtractor;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFit API v{}", env!("CARGO_PKG_VERSION"));

    let scoring = config.scoring()?;
    let extractor = Arc::new(SignalExtractor::new(config.category_tables()?));

    // Persistence: PostgreSQL when configured, otherwise process-local memory
    let (cache, store): (Arc<dyn JobCache>, Arc<dyn RecommendationStore>) =
        match &config.database_url {
            Some(url) => {
                let db = create_pool(url).await?;
                ensure_schema(&db).await?;
                (
                    Arc::new(PgJobCache::new(db.clone())),
                    Arc::new(PgRecommendationStore::new(db)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; job cache and recommendations are in-memory only");
                (
                    Arc::new(MemoryJobCache::new()),
                    Arc::new(MemoryRecommendationStore::new()),
                )
            }
        };

    let oracle: Arc<dyn ScoringOracle> = Arc::new(HttpScoringOracle::new(
        &config.scoring_oracle_url,
        config.oracle_timeout,
    )?);
    info!("Scoring oracle client initialized ({})", config.scoring_oracle_url);

    let provider = Arc::new(HttpJobProvider::new(
        &config.job_provider_url,
        config.provider_timeout,
    )?);
    info!(
        "Job provider client initialized (budget: {} calls)",
        config.api_call_limit
    );

    let service = RecommendationService::new(
        extractor.clone(),
        AtsScorer::new(
            oracle.clone(),
            extractor.clone(),
            scoring.ats,
            config.oracle_timeout,
        ),
        JobSource::new(
            provider,
            cache,
            ApiBudget::new(config.api_call_limit),
            config.provider_timeout,
            config.cache_row_limit,
        ),
        MatchRanker::new(oracle, extractor, scoring.ranking, config.oracle_timeout),
        store,
        config.pipeline_timeout,
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        service: Arc::new(service),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ats::rules::AtsConfig;
use crate::matching::RankingConfig;
use crate::signals::CategoryTables;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// In-memory cache and store are used when unset.
    pub database_url: Option<String>,
    pub job_provider_url: String,
    pub scoring_oracle_url: String,
    pub api_call_limit: u32,
    pub provider_timeout: Duration,
    pub oracle_timeout: Duration,
    pub pipeline_timeout: Duration,
    pub cache_row_limit: usize,
    pub max_results: usize,
    pub scoring_config_path: Option<PathBuf>,
    pub skill_categories_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            job_provider_url: require_env("JOB_PROVIDER_URL")?,
            scoring_oracle_url: optional_env("SCORING_ORACLE_URL")
                .unwrap_or_else(|| "http://localhost:5001".to_string()),
            api_call_limit: parse_env("API_CALL_LIMIT", 500)?,
            provider_timeout: Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 10)?),
            oracle_timeout: Duration::from_secs(parse_env("ORACLE_TIMEOUT_SECS", 30)?),
            pipeline_timeout: Duration::from_secs(parse_env("PIPELINE_TIMEOUT_SECS", 60)?),
            cache_row_limit: parse_env("CACHE_ROW_LIMIT", 50)?,
            max_results: parse_env("MAX_RESULTS", 20)?,
            scoring_config_path: optional_env("SCORING_CONFIG_PATH").map(PathBuf::from),
            skill_categories_path: optional_env("SKILL_CATEGORIES_PATH").map(PathBuf::from),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Scoring weights from `SCORING_CONFIG_PATH`, or the built-in defaults.
    /// `MAX_RESULTS` overrides the file's result cap.
    pub fn scoring(&self) -> Result<ScoringConfig> {
        let mut scoring = match &self.scoring_config_path {
            Some(path) => ScoringConfig::from_file(path)?,
            None => ScoringConfig::default(),
        };
        scoring.ranking.max_results = self.max_results;
        Ok(scoring)
    }

    /// Category tables from `SKILL_CATEGORIES_PATH`, or the embedded defaults.
    pub fn category_tables(&self) -> Result<CategoryTables> {
        match &self.skill_categories_path {
            Some(path) => CategoryTables::from_file(path),
            None => Ok(CategoryTables::default()),
        }
    }
}

/// Tunable scoring constants. Every field is optional in the JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub ats: AtsConfig,
    pub ranking: RankingConfig,
}

impl ScoringConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring config at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scoring config in {}", path.display()))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

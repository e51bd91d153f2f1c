//! Live job provider client. The provider's payload is untrusted: every field
//! may be missing, and a posting without a link has no identity and is dropped.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::job::{JobPosting, DEFAULT_JOB_TYPE, SALARY_NOT_SPECIFIED};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    keywords: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderResponse {
    #[serde(default)]
    total_count: Option<u64>,
    jobs: Option<Vec<ProviderJob>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderJob {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default, rename = "type")]
    job_type: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    updated: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderPage {
    pub total_count: u64,
    pub postings: Vec<JobPosting>,
}

#[async_trait]
pub trait JobProvider: Send + Sync {
    async fn fetch(
        &self,
        keywords: &str,
        location: Option<&str>,
        page: u32,
    ) -> Result<ProviderPage, ProviderError>;
}

pub struct HttpJobProvider {
    client: Client,
    endpoint: String,
}

impl HttpJobProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl JobProvider for HttpJobProvider {
    async fn fetch(
        &self,
        keywords: &str,
        location: Option<&str>,
        page: u32,
    ) -> Result<ProviderPage, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProviderRequest {
                keywords,
                location,
                page,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response.bytes().await?;
        let page = parse_page(&bytes, Utc::now())?;
        debug!(
            postings = page.postings.len(),
            total = page.total_count,
            "Provider page fetched"
        );
        Ok(page)
    }
}

/// Parses a provider body. `now` stands in for missing or unparseable timestamps.
pub fn parse_page(body: &[u8], now: DateTime<Utc>) -> Result<ProviderPage, ProviderError> {
    let response: ProviderResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let jobs = response
        .jobs
        .ok_or_else(|| ProviderError::Malformed("missing `jobs` array".to_string()))?;

    let total = jobs.len() as u64;
    let postings: Vec<JobPosting> = jobs.into_iter().filter_map(|j| to_posting(j, now)).collect();

    Ok(ProviderPage {
        total_count: response.total_count.unwrap_or(total),
        postings,
    })
}

fn to_posting(job: ProviderJob, now: DateTime<Utc>) -> Option<JobPosting> {
    let url = non_empty(job.link)?;

    Some(JobPosting {
        title: non_empty(job.title).unwrap_or_else(|| "Untitled position".to_string()),
        company: non_empty(job.company).unwrap_or_else(|| "Unknown company".to_string()),
        location: non_empty(job.location).unwrap_or_default(),
        snippet: job.snippet.map(|s| clean_snippet(&s)).unwrap_or_default(),
        salary: non_empty(job.salary).unwrap_or_else(|| SALARY_NOT_SPECIFIED.to_string()),
        job_type: non_empty(job.job_type).unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string()),
        posted_at: job.updated.as_deref().and_then(parse_timestamp).unwrap_or(now),
        url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_snippet(raw: &str) -> String {
    let stripped = HTML_TAG.replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_fields_get_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let body = br#"{"jobs": [{"link": "https://jobs.example/1", "title": "Rust Dev"}]}"#;

        let page = parse_page(body, now).unwrap();
        assert_eq!(page.total_count, 1);
        let posting = &page.postings[0];
        assert_eq!(posting.salary, SALARY_NOT_SPECIFIED);
        assert_eq!(posting.job_type, DEFAULT_JOB_TYPE);
        assert_eq!(posting.company, "Unknown company");
        assert_eq!(posting.posted_at, now);
    }

    #[test]
    fn test_postings_without_link_are_dropped() {
        let body = br#"{"totalCount": 40, "jobs": [{"title": "No link"}, {"link": "  "}, {"link": "https://a"}]}"#;
        let page = parse_page(body, Utc::now()).unwrap();
        assert_eq!(page.total_count, 40);
        assert_eq!(page.postings.len(), 1);
        assert_eq!(page.postings[0].url, "https://a");
    }

    #[test]
    fn test_malformed_bodies_are_errors() {
        assert!(matches!(
            parse_page(b"<html>", Utc::now()),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            parse_page(br#"{"error": "bad key"}"#, Utc::now()),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 2, 27, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2026-02-27T09:30:00.0000000"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-27T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-27T10:30:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_snippet_html_is_stripped() {
        assert_eq!(
            clean_snippet("&nbsp;<b>Python</b> developer&nbsp;needed\n for <i>R&amp;D</i>"),
            "Python developer needed for R&D"
        );
    }

    #[test]
    fn test_request_omits_missing_location() {
        let body = serde_json::to_value(ProviderRequest {
            keywords: "rust",
            location: None,
            page: 1,
        })
        .unwrap();
        assert!(body.get("location").is_none());
        assert_eq!(body["page"], 1);
    }
}

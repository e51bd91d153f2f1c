use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SALARY_NOT_SPECIFIED: &str = "Not specified";
pub const DEFAULT_JOB_TYPE: &str = "Full-time";

/// A job posting. Identity is `url`: two postings with the same URL are the same entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub snippet: String,
    pub salary: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub posted_at: DateTime<Utc>,
    #[serde(rename = "canonicalUrl")]
    pub url: String,
}

impl JobPosting {
    pub fn has_salary(&self) -> bool {
        let salary = self.salary.trim();
        !salary.is_empty() && !salary.eq_ignore_ascii_case(SALARY_NOT_SPECIFIED)
    }

    /// Age in whole days (floor), never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.posted_at).num_days().max(0)
    }

    /// Lower-cased title + snippet, the text matched against résumé skills.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.snippet).to_lowercase()
    }
}

/// Cached columns of a `job_postings` row.
#[derive(Debug, Clone, FromRow)]
pub struct JobPostingRow {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub snippet: String,
    pub salary: String,
    pub job_type: String,
    pub posted_at: DateTime<Utc>,
}

impl From<JobPostingRow> for JobPosting {
    fn from(row: JobPostingRow) -> Self {
        JobPosting {
            title: row.title,
            company: row.company,
            location: row.location,
            snippet: row.snippet,
            salary: row.salary,
            job_type: row.job_type,
            posted_at: row.posted_at,
            url: row.url,
        }
    }
}

#[cfg(test)]
pub(crate) fn posting(url: &str, title: &str, snippet: &str, age_days: i64) -> JobPosting {
    JobPosting {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Berlin".to_string(),
        snippet: snippet.to_string(),
        salary: SALARY_NOT_SPECIFIED.to_string(),
        job_type: DEFAULT_JOB_TYPE.to_string(),
        posted_at: Utc::now() - chrono::Duration::days(age_days),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_has_salary_ignores_placeholder() {
        let mut job = posting("https://jobs/1", "Dev", "", 0);
        assert!(!job.has_salary());
        job.salary = "  ".to_string();
        assert!(!job.has_salary());
        job.salary = "$120k".to_string();
        assert!(job.has_salary());
    }

    #[test]
    fn test_age_days_floors_partial_days() {
        let now = Utc::now();
        let mut job = posting("https://jobs/1", "Dev", "", 0);
        job.posted_at = now - Duration::hours(47);
        assert_eq!(job.age_days(now), 1);
        job.posted_at = now + Duration::hours(3);
        assert_eq!(job.age_days(now), 0);
    }

    #[test]
    fn test_serialized_field_names() {
        let job = posting("https://jobs/1", "Dev", "", 0);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["canonicalUrl"], "https://jobs/1");
        assert_eq!(value["type"], DEFAULT_JOB_TYPE);
        assert!(value.get("postedAt").is_some());
    }
}

use std::collections::HashSet;

use crate::models::job::JobPosting;

/// Merges posting lists, keeping the first posting seen for each URL.
/// Relative order of first appearance across the concatenated input is preserved.
pub fn dedupe<I>(lists: I) -> Vec<JobPosting>
where
    I: IntoIterator<Item = Vec<JobPosting>>,
{
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|p| seen.insert(p.url.trim().to_string()))
        .collect()
}

//! Job Source — live provider search behind a call budget, with the posting
//! cache as fallback, plus cross-source de-duplication.

pub mod budget;
pub mod cache;
pub mod dedup;
pub mod provider;
pub mod source;

pub use budget::{ApiBudget, BudgetStatus};
pub use cache::{JobCache, MemoryJobCache, PgJobCache};
pub use provider::{HttpJobProvider, JobProvider};
pub use source::{JobSearchResult, JobSource};

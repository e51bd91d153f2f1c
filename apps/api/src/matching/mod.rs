//! Match Ranker — validation gate, semantic batch scoring with a rule-based
//! fallback, then filtering and ordering.

pub mod ranker;
pub mod rules;
pub mod validation;

pub use ranker::MatchRanker;
pub use rules::RankingConfig;

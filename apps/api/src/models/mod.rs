pub mod job;
pub mod recommendation;
pub mod resume;

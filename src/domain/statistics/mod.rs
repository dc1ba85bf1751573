//! Critical Statistics Invariants:
//!
//! 1. Statistics are ALWAYS derived, NEVER primary
//! 2. Statistics can be recalculated at any time from post records
//! 3. Statistics can be deleted without affecting posts
//! 4. Statistics NEVER alter post state
//! 5. Stale statistics are acceptable (eventual consistency)

pub mod entity;
pub use entity::{
    ArchiveStatistics, AuthorCount, FilterVocabulary, StatisticsSnapshot, StatisticsType,
    TOP_AUTHORS_LIMIT,
};

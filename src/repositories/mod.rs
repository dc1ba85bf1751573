// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invariant enforcement
// - NO event emission
// - NO cross-repository calls
// - Explicit SQL only

pub mod post_repository;
pub mod statistics_repository;

pub use post_repository::{PostRepository, SqlitePostRepository};
pub use statistics_repository::{SqliteStatisticsRepository, StatisticsRepository};

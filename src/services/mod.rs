// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod lifecycle_service;
pub mod post_service;
pub mod scan_service;
pub mod statistics_service;
pub mod task_orchestrator;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod task_orchestrator_tests;

pub use lifecycle_service::{LifecycleService, RecordOutcome};
pub use post_service::PostService;
pub use scan_service::{ScanRequest, ScanService};
pub use statistics_service::StatisticsService;
pub use task_orchestrator::{ExclusiveGuard, OrchestratorSettings, TaskOrchestrator};

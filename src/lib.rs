// src/lib.rs
// Postkeeper - Local-first archive for social media posts referenced from Markdown notes
//
// Architecture:
// - Domain-centric: URL identity, post lifecycle and queries live in `domain`
// - Single writer path: every post mutation goes through the Post Record Store
// - Event-driven: services coordinate through a synchronous event bus
// - Explicit: one background task at a time, observed by polling
// - Local-first: records, media and thumbnails stay under the data dir

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod store;

// ============================================================================
// BOUNDARIES
// ============================================================================

pub mod application;
pub mod integrations;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    normalize,
    ArchiveStatistics,
    FilterVocabulary,
    MediaType,
    NormalizedUrl,
    Platform,
    PostId,
    PostPage,
    PostQuery,
    PostRecord,
    PostStatus,
    ScanResult,
    SortField,
    TaskKind,
    TaskPhase,
    TaskStatus,
};

// ============================================================================
// PUBLIC API - Errors
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{create_event_bus, DomainEvent, EventBus, EventLogEntry};

// ============================================================================
// PUBLIC API - Store & Services
// ============================================================================

pub use config::{AppConfig, AuthConfig, ConfigStore};
pub use services::{
    LifecycleService, PostService, ScanRequest, ScanService, StatisticsService, TaskOrchestrator,
};
pub use store::{PostStore, StoreLayout};

// ============================================================================
// PUBLIC API - Application
// ============================================================================

pub use application::{AppState, CommandResult, ErrorResponse};

// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file MUST declare all domain modules and re-export their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod link;
pub mod post;
pub mod query;
pub mod scan;
pub mod statistics;
pub mod task;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// URL identity
pub use link::{normalize, ExtractedLink, LinkExtractor, NormalizedUrl, Platform};

// Post Domain
pub use post::{
    can_transition, validate_post, MediaType, PostId, PostMetadata, PostRecord, PostStatus,
    Reachability, TransitionOrigin, ValidationReport,
};

// Scan
pub use scan::{DuplicateGroup, ScanResult, ScanWarning, ScannedUrl, UrlState};

// Background tasks
pub use task::{RecentRecord, TaskKind, TaskPhase, TaskStatus};

// Queries
pub use query::{PostPage, PostQuery, QueryKey, SortField};

// Statistics Domain (Derived Data)
pub use statistics::{
    ArchiveStatistics, AuthorCount, FilterVocabulary, StatisticsSnapshot, StatisticsType,
};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: PostStatus, to: PostStatus },

    #[error("Metadata cannot be written to a {status} post")]
    MetadataRejected { status: PostStatus },

    #[error("A {status} post needs a passing validation first")]
    ValidationRequired { status: PostStatus },

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;

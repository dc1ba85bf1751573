// events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - No business logic in event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Platform, PostId, PostStatus, TaskKind};

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

macro_rules! domain_event {
    ($name:ident) => {
        impl DomainEvent for $name {
            fn event_id(&self) -> Uuid {
                self.event_id
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }
            fn event_type(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

// ============================================================================
// SCAN EVENTS
// ============================================================================

/// Emitted once per new stub inserted by a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDiscovered {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub post_id: PostId,
    pub platform: Platform,
    pub source_file: String,
}

impl PostDiscovered {
    pub fn new(post_id: PostId, platform: Platform, source_file: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            post_id,
            platform,
            source_file,
        }
    }
}

domain_event!(PostDiscovered);

/// Emitted when a scan finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source_dir: String,
    pub files_scanned: usize,
    pub unique_urls: usize,
    pub new_urls: usize,
}

impl ScanCompleted {
    pub fn new(source_dir: String, files_scanned: usize, unique_urls: usize, new_urls: usize) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source_dir,
            files_scanned,
            unique_urls,
            new_urls,
        }
    }
}

domain_event!(ScanCompleted);

// ============================================================================
// POST LIFECYCLE EVENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostStatusChanged {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub post_id: PostId,
    pub from: PostStatus,
    pub to: PostStatus,
}

impl PostStatusChanged {
    pub fn new(post_id: PostId, from: PostStatus, to: PostStatus) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            post_id,
            from,
            to,
        }
    }
}

domain_event!(PostStatusChanged);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMetadataScraped {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub post_id: PostId,
    pub author: Option<String>,
}

impl PostMetadataScraped {
    pub fn new(post_id: PostId, author: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            post_id,
            author,
        }
    }
}

domain_event!(PostMetadataScraped);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMediaDownloaded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub post_id: PostId,
    pub file_count: usize,
}

impl PostMediaDownloaded {
    pub fn new(post_id: PostId, file_count: usize) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            post_id,
            file_count,
        }
    }
}

domain_event!(PostMediaDownloaded);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsDeleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub post_ids: Vec<PostId>,
}

impl PostsDeleted {
    pub fn new(post_ids: Vec<PostId>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            post_ids,
        }
    }
}

domain_event!(PostsDeleted);

// ============================================================================
// TASK EVENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStarted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: TaskKind,
    pub total: usize,
}

impl TaskStarted {
    pub fn new(kind: TaskKind, total: usize) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind,
            total,
        }
    }
}

domain_event!(TaskStarted);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFinished {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: TaskKind,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when the task itself aborted rather than completing
    pub error: Option<String>,
}

impl TaskFinished {
    pub fn new(
        kind: TaskKind,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        error: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind,
            succeeded,
            failed,
            skipped,
            error,
        }
    }
}

domain_event!(TaskFinished);

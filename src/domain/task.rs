use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

use crate::domain::link::Platform;
use crate::domain::post::{PostId, PostRecord, PostStatus};
use crate::domain::DomainError;

/// Number of per-record error strings kept on the status
pub const ERROR_HISTORY_LIMIT: usize = 10;

/// Characters of content kept in a recent-record preview
const PREVIEW_CHARS: usize = 100;

/// Kind of background operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Validate,
    Scrape,
    Download,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Validate => "validate",
            TaskKind::Scrape => "scrape",
            TaskKind::Download => "download",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(TaskKind::Validate),
            "scrape" => Ok(TaskKind::Scrape),
            "download" => Ok(TaskKind::Download),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown task kind '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle of the task handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskPhase {
    Idle,
    Running,
    Completed { summary: String },
    Failed { error: String },
}

/// Light projection of a post that just finished processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentRecord {
    pub id: PostId,
    pub url: String,
    pub platform: Platform,
    pub status: PostStatus,
    pub author: Option<String>,
    pub preview: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub thumbnail_path: Option<String>,
}

impl From<&PostRecord> for RecentRecord {
    fn from(post: &PostRecord) -> Self {
        let preview = post
            .content
            .as_ref()
            .or(post.title.as_ref())
            .map(|text| text.chars().take(PREVIEW_CHARS).collect());
        Self {
            id: post.id.clone(),
            url: post.url.clone(),
            platform: post.platform,
            status: post.status,
            author: post.author.clone(),
            preview,
            views: post.views,
            likes: post.likes,
            thumbnail_path: post.thumbnail_path.clone(),
        }
    }
}

/// Observable state of the single background task slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub is_running: bool,
    pub current_task: Option<TaskKind>,
    pub phase: TaskPhase,
    pub progress: usize,
    pub total: usize,
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Newest last, capped at `ERROR_HISTORY_LIMIT`
    pub errors: VecDeque<String>,
    /// Newest last, capped by the orchestrator's configured capacity
    pub recent: VecDeque<RecentRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl TaskStatus {
    pub fn idle() -> Self {
        Self {
            is_running: false,
            current_task: None,
            phase: TaskPhase::Idle,
            progress: 0,
            total: 0,
            message: "Idle".to_string(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
            errors: VecDeque::new(),
            recent: VecDeque::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh running state for `kind` over `total` targets
    pub fn running(kind: TaskKind, total: usize) -> Self {
        Self {
            is_running: true,
            current_task: Some(kind),
            phase: TaskPhase::Running,
            total,
            message: format!("Starting {} of {} posts", kind, total),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    pub fn push_error(&mut self, error: String) {
        if self.errors.len() == ERROR_HISTORY_LIMIT {
            self.errors.pop_front();
        }
        self.errors.push_back(error);
    }

    pub fn push_recent(&mut self, record: RecentRecord, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.recent.len() >= capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(record);
    }

    pub fn summary(&self) -> String {
        let kind = self.current_task.map(|k| k.as_str()).unwrap_or("task");
        format!(
            "{} finished: {} succeeded, {} failed, {} skipped (of {})",
            kind, self.succeeded, self.failed, self.skipped, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(n: u64) -> RecentRecord {
        RecentRecord {
            id: PostId::from_normalized(&format!("https://instagram.com/p/{}", n)),
            url: format!("https://instagram.com/p/{}", n),
            platform: Platform::Instagram,
            status: PostStatus::Accessible,
            author: None,
            preview: None,
            views: None,
            likes: Some(n),
            thumbnail_path: None,
        }
    }

    #[test]
    fn test_recent_buffer_drops_oldest() {
        let mut status = TaskStatus::running(TaskKind::Scrape, 5);
        for n in 0..5 {
            status.push_recent(recent(n), 3);
        }
        let likes: Vec<_> = status.recent.iter().map(|r| r.likes.unwrap()).collect();
        assert_eq!(likes, vec![2, 3, 4]);
    }

    #[test]
    fn test_error_history_is_bounded() {
        let mut status = TaskStatus::idle();
        for n in 0..15 {
            status.push_error(format!("e{}", n));
        }
        assert_eq!(status.errors.len(), ERROR_HISTORY_LIMIT);
        assert_eq!(status.errors.front().map(String::as_str), Some("e5"));
    }

    #[test]
    fn test_running_resets_counters() {
        let status = TaskStatus::running(TaskKind::Validate, 4);
        assert!(status.is_running);
        assert_eq!(status.phase, TaskPhase::Running);
        assert_eq!(status.progress, 0);
        assert_eq!(status.total, 4);
    }
}

// src/application/dto/mod.rs
//
// Data Transfer Objects
//
// CRITICAL PRINCIPLES:
// - DTOs are UI-friendly representations
// - DTOs NEVER leak domain invariants
// - DTOs are simple, serializable structs
// - Conversion FROM domain entities only; inbound DTOs are parsed, never trusted

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{AppConfig, AuthConfig};
use crate::domain::{
    MediaType, Platform, PostId, PostPage, PostQuery, PostRecord, PostStatus, RecentRecord,
    SortField, TaskPhase, TaskStatus,
};
use crate::store::DeleteReport;

// ============================================================================
// POST DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDto {
    pub id: String,
    pub url: String,
    pub normalized_url: String,
    pub platform: String,
    pub status: String,
    pub source_file: String,
    pub source_context: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub posted_at: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub media_type: Option<String>,
    pub media_paths: Vec<String>,
    pub thumbnail_path: Option<String>,
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub error_message: Option<String>,
    pub last_reachability: Option<String>,
    pub validated_at: Option<String>,
    pub scraped_at: Option<String>,
    pub downloaded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostRecord> for PostDto {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id.to_string(),
            url: post.url,
            normalized_url: post.normalized_url,
            platform: post.platform.to_string(),
            status: post.status.to_string(),
            source_file: post.source_file,
            source_context: post.source_context,
            author: post.author,
            author_url: post.author_url,
            title: post.title,
            content: post.content,
            posted_at: post.posted_at.map(|d| d.to_rfc3339()),
            views: post.views,
            likes: post.likes,
            comments: post.comments,
            shares: post.shares,
            media_type: post.media_type.map(|m| m.to_string()),
            media_paths: post.media_paths,
            thumbnail_path: post.thumbnail_path,
            tags: post.tags.into_iter().collect(),
            note: post.note,
            error_message: post.error_message,
            last_reachability: post.last_reachability.map(|r| r.to_string()),
            validated_at: post.validated_at.map(|d| d.to_rfc3339()),
            scraped_at: post.scraped_at.map(|d| d.to_rfc3339()),
            downloaded_at: post.downloaded_at.map(|d| d.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPageDto {
    pub posts: Vec<PostDto>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl From<PostPage> for PostPageDto {
    fn from(page: PostPage) -> Self {
        Self {
            posts: page.records.into_iter().map(PostDto::from).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Inbound query; every vocabulary field is parsed before use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListPostsDto {
    pub status: Vec<String>,
    pub platform: Vec<String>,
    pub authors: Vec<String>,
    pub media_type: Vec<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListPostsDto {
    pub fn into_query(self) -> Result<PostQuery, String> {
        let defaults = PostQuery::default();
        Ok(PostQuery {
            statuses: parse_all::<PostStatus>(&self.status)?,
            platforms: parse_all::<Platform>(&self.platform)?,
            authors: self.authors,
            media_types: parse_all::<MediaType>(&self.media_type)?,
            tag: self.tag.filter(|t| !t.trim().is_empty()),
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortField::from_str)
                .transpose()
                .map_err(|e| e.to_string())?
                .unwrap_or(defaults.sort_by),
            sort_desc: self.sort_desc.unwrap_or(defaults.sort_desc),
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn parse_all<T>(raw: &[String]) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.iter()
        .map(|value| T::from_str(value.trim()).map_err(|e| e.to_string()))
        .collect()
}

/// Parse a list of post ids from user input
pub fn parse_post_ids(raw: &[String]) -> Result<Vec<PostId>, String> {
    raw.iter()
        .map(|id| PostId::parse(id.trim()).map_err(|e| e.to_string()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResultDto {
    pub deleted_count: usize,
    pub errors: Vec<DeleteErrorDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteErrorDto {
    pub id: String,
    pub message: String,
}

impl From<DeleteReport> for DeleteResultDto {
    fn from(report: DeleteReport) -> Self {
        Self {
            deleted_count: report.deleted_count,
            errors: report
                .errors
                .into_iter()
                .map(|e| DeleteErrorDto {
                    id: e.id,
                    message: e.message,
                })
                .collect(),
        }
    }
}

// ============================================================================
// TASK DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAcceptedDto {
    pub task: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRecordDto {
    pub id: String,
    pub url: String,
    pub platform: String,
    pub status: String,
    pub author: Option<String>,
    pub preview: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub thumbnail_path: Option<String>,
}

impl From<RecentRecord> for RecentRecordDto {
    fn from(record: RecentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            url: record.url,
            platform: record.platform.to_string(),
            status: record.status.to_string(),
            author: record.author,
            preview: record.preview,
            views: record.views,
            likes: record.likes,
            thumbnail_path: record.thumbnail_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusDto {
    pub is_running: bool,
    pub current_task: Option<String>,
    /// idle | running | completed | failed
    pub state: String,
    pub progress: usize,
    pub total: usize,
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub recent: Vec<RecentRecordDto>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl From<TaskStatus> for TaskStatusDto {
    fn from(status: TaskStatus) -> Self {
        let state = match status.phase {
            TaskPhase::Idle => "idle",
            TaskPhase::Running => "running",
            TaskPhase::Completed { .. } => "completed",
            TaskPhase::Failed { .. } => "failed",
        };
        Self {
            is_running: status.is_running,
            current_task: status.current_task.map(|k| k.to_string()),
            state: state.to_string(),
            progress: status.progress,
            total: status.total,
            message: status.message,
            succeeded: status.succeeded,
            failed: status.failed,
            skipped: status.skipped,
            errors: status.errors.into_iter().collect(),
            recent: status.recent.into_iter().map(RecentRecordDto::from).collect(),
            started_at: status.started_at.map(|d| d.to_rfc3339()),
            finished_at: status.finished_at.map(|d| d.to_rfc3339()),
        }
    }
}

// ============================================================================
// CONFIG DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDto {
    pub source_dir: Option<String>,
    pub file_pattern: String,
    pub recursive: bool,
    /// browser-cookies | cookie-file
    pub auth_mode: String,
    pub browser: Option<String>,
    pub cookie_file: Option<String>,
    pub restart_required: bool,
}

impl ConfigDto {
    pub fn from_config(config: &AppConfig, restart_required: bool) -> Self {
        let (auth_mode, browser, cookie_file) = match &config.auth {
            AuthConfig::BrowserCookies { browser } => ("browser-cookies", Some(browser.clone()), None),
            AuthConfig::CookieFile { path } => {
                ("cookie-file", None, Some(path.to_string_lossy().into_owned()))
            }
        };
        Self {
            source_dir: config
                .source_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            file_pattern: config.file_pattern.clone(),
            recursive: config.recursive,
            auth_mode: auth_mode.to_string(),
            browser,
            cookie_file,
            restart_required,
        }
    }
}

/// Inbound config change; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfigDto {
    pub source_dir: Option<String>,
    pub file_pattern: Option<String>,
    pub recursive: Option<bool>,
    pub auth_mode: Option<String>,
    pub browser: Option<String>,
    pub cookie_file: Option<String>,
}

impl UpdateConfigDto {
    /// Resolve the auth fields against the current auth setting
    pub fn auth(&self, current: &AuthConfig) -> Result<Option<AuthConfig>, String> {
        let mode = match (&self.auth_mode, &self.browser, &self.cookie_file) {
            (Some(mode), _, _) => mode.as_str(),
            (None, Some(_), _) => "browser-cookies",
            (None, None, Some(_)) => "cookie-file",
            (None, None, None) => return Ok(None),
        };

        match mode {
            "browser-cookies" => {
                let browser = match (&self.browser, current) {
                    (Some(browser), _) => browser.clone(),
                    (None, AuthConfig::BrowserCookies { browser }) => browser.clone(),
                    (None, _) => return Err("browser-cookies mode needs a browser".to_string()),
                };
                Ok(Some(AuthConfig::BrowserCookies { browser }))
            }
            "cookie-file" => {
                let path = match (&self.cookie_file, current) {
                    (Some(path), _) => PathBuf::from(path),
                    (None, AuthConfig::CookieFile { path }) => path.clone(),
                    (None, _) => return Err("cookie-file mode needs a cookie file path".to_string()),
                };
                Ok(Some(AuthConfig::CookieFile { path }))
            }
            other => Err(format!(
                "Unknown auth mode '{}' (expected browser-cookies or cookie-file)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_dto_parses_vocabulary() {
        let query = ListPostsDto {
            status: vec!["accessible".into()],
            platform: vec!["instagram".into(), "threads".into()],
            sort_by: Some("likes".into()),
            limit: Some(2),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.statuses, vec![PostStatus::Accessible]);
        assert_eq!(query.platforms, vec![Platform::Instagram, Platform::Threads]);
        assert_eq!(query.sort_by, SortField::Likes);
        assert!(query.sort_desc);
        assert_eq!(query.limit, 2);
    }

    #[test]
    fn test_list_dto_rejects_unknown_values() {
        let bad_status = ListPostsDto {
            status: vec!["archived".into()],
            ..Default::default()
        };
        assert!(bad_status.into_query().is_err());

        let bad_sort = ListPostsDto {
            sort_by: Some("comments".into()),
            ..Default::default()
        };
        assert!(bad_sort.into_query().is_err());
    }

    #[test]
    fn test_auth_resolution() {
        let current = AuthConfig::default();

        let none = UpdateConfigDto::default().auth(&current).unwrap();
        assert!(none.is_none());

        let file = UpdateConfigDto {
            cookie_file: Some("/tmp/c.txt".into()),
            ..Default::default()
        }
        .auth(&current)
        .unwrap();
        assert_eq!(
            file,
            Some(AuthConfig::CookieFile {
                path: PathBuf::from("/tmp/c.txt")
            })
        );

        let missing = UpdateConfigDto {
            auth_mode: Some("cookie-file".into()),
            ..Default::default()
        }
        .auth(&current);
        assert!(missing.is_err());
    }

    #[test]
    fn test_task_status_dto_state() {
        let dto = TaskStatusDto::from(TaskStatus::idle());
        assert_eq!(dto.state, "idle");
        assert!(!dto.is_running);
    }
}

// src/domain/post/transitions.rs
//
// Post Status State Machine
//
// CRITICAL RULES:
// - The ONLY place that assigns `PostRecord::status`
// - `pending` is reachable on creation only, never by transition
// - `private` and `deleted` are terminal for automated flows
// - Entering `error` requires a message, entering anything else clears it
// - Metadata is written only to records that are (or become) `accessible`
// - Only a passing validation makes a record `accessible`; scrape/download
//   may recover an `error` record only if its last validation was a pass

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::entity::{PostMetadata, PostRecord, PostStatus};
use crate::domain::{DomainError, DomainResult};

/// Who asked for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrigin {
    /// Background pipeline processing its default targets
    Automated,
    /// User explicitly re-checking named records
    ManualRevalidation,
}

/// How the validation capability classified a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Accessible,
    Private,
    Deleted,
    TransientError,
}

impl Reachability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reachability::Accessible => "accessible",
            Reachability::Private => "private",
            Reachability::Deleted => "deleted",
            Reachability::TransientError => "transient_error",
        }
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reachability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accessible" => Ok(Reachability::Accessible),
            "private" => Ok(Reachability::Private),
            "deleted" => Ok(Reachability::Deleted),
            "transient_error" => Ok(Reachability::TransientError),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown reachability '{}'",
                other
            ))),
        }
    }
}

/// Result of one validation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub reachable: bool,
    pub classification: Reachability,
    pub http_status: Option<u16>,
    pub message: Option<String>,
}

impl ValidationReport {
    pub fn accessible(http_status: Option<u16>) -> Self {
        Self {
            reachable: true,
            classification: Reachability::Accessible,
            http_status,
            message: None,
        }
    }

    pub fn classified(classification: Reachability, message: impl Into<String>) -> Self {
        Self {
            reachable: classification == Reachability::Accessible,
            classification,
            http_status: None,
            message: Some(message.into()),
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

/// Legality table for status changes.
pub fn can_transition(from: PostStatus, to: PostStatus, origin: TransitionOrigin) -> bool {
    use PostStatus::*;

    if to == Pending {
        return false;
    }

    match origin {
        TransitionOrigin::ManualRevalidation => true,
        TransitionOrigin::Automated => match from {
            Pending | Error => true,
            Accessible => matches!(to, Accessible | Error),
            Private | Deleted => false,
        },
    }
}

impl PostRecord {
    /// Move to `to`, enforcing the legality table and the error-message rule.
    pub fn transition_to(
        &mut self,
        to: PostStatus,
        origin: TransitionOrigin,
        error_message: Option<String>,
    ) -> DomainResult<()> {
        if !can_transition(self.status, to, origin) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }

        if to == PostStatus::Error {
            let message = error_message
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| {
                    DomainError::InvariantViolation(
                        "Entering error status requires an error message".to_string(),
                    )
                })?;
            self.error_message = Some(message);
        } else {
            self.error_message = None;
        }

        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a validation result. Returns the resulting status.
    ///
    /// A transient failure never produces `private`/`deleted`; the record
    /// lands in `error` so it can be retried.
    pub fn record_validation(
        &mut self,
        report: &ValidationReport,
        origin: TransitionOrigin,
    ) -> DomainResult<PostStatus> {
        let (target, message) = match report.classification {
            Reachability::Accessible if report.reachable => (PostStatus::Accessible, None),
            Reachability::Accessible => (
                PostStatus::Error,
                Some(
                    report
                        .message
                        .clone()
                        .unwrap_or_else(|| "Reported accessible but not reachable".to_string()),
                ),
            ),
            Reachability::Private => (PostStatus::Private, None),
            Reachability::Deleted => (PostStatus::Deleted, None),
            Reachability::TransientError => (
                PostStatus::Error,
                Some(
                    report
                        .message
                        .clone()
                        .unwrap_or_else(|| "Transient validation failure".to_string()),
                ),
            ),
        };

        self.transition_to(target, origin, message)?;
        self.last_reachability = Some(match (target, report.classification) {
            (PostStatus::Accessible, _) => Reachability::Accessible,
            (_, Reachability::Accessible) => Reachability::TransientError,
            (_, classification) => classification,
        });
        self.validated_at = Some(Utc::now());
        Ok(target)
    }

    /// Whether the most recent validation reported the URL reachable
    pub fn reachability_confirmed(&self) -> bool {
        self.last_reachability == Some(Reachability::Accessible)
    }

    /// `error` -> `accessible` after a successful scrape/download.
    ///
    /// Refused unless the last validation passed: a record whose validation
    /// failed must be validated again before it can become `accessible`.
    fn recover_from_error(&mut self) -> DomainResult<()> {
        if self.status != PostStatus::Error {
            return Ok(());
        }
        if !self.reachability_confirmed() {
            return Err(DomainError::ValidationRequired {
                status: self.status,
            });
        }
        self.transition_to(PostStatus::Accessible, TransitionOrigin::Automated, None)
    }

    /// Record a per-record pipeline failure (scrape, download, timeout).
    pub fn record_failure(&mut self, message: impl Into<String>) -> DomainResult<()> {
        self.transition_to(
            PostStatus::Error,
            TransitionOrigin::Automated,
            Some(message.into()),
        )
    }

    /// Write scraped metadata.
    ///
    /// An `error` record whose last validation passed recovers to
    /// `accessible` first. Any other non-accessible record rejects the
    /// write and stays untouched.
    pub fn apply_metadata(&mut self, metadata: PostMetadata) -> DomainResult<()> {
        self.recover_from_error()?;
        if self.status != PostStatus::Accessible {
            return Err(DomainError::MetadataRejected {
                status: self.status,
            });
        }

        self.author = metadata.author;
        self.author_url = metadata.author_url;
        self.title = metadata.title;
        self.content = metadata.content;
        self.posted_at = metadata.posted_at;
        self.views = metadata.views;
        self.likes = metadata.likes;
        self.comments = metadata.comments;
        self.shares = metadata.shares;
        self.media_type = metadata.media_type;
        self.thumbnail_url = metadata.thumbnail_url;
        if !metadata.media_urls.is_empty() {
            self.media_urls = metadata.media_urls;
        }

        let now = Utc::now();
        self.scraped_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether the download capability may run for this record
    pub fn ready_for_download(&self) -> bool {
        self.is_scraped()
            && match self.status {
                PostStatus::Accessible => true,
                PostStatus::Error => self.reachability_confirmed(),
                _ => false,
            }
    }

    /// Attach locally downloaded media files.
    pub fn attach_media(&mut self, paths: Vec<String>) -> DomainResult<()> {
        if !self.ready_for_download() {
            return Err(DomainError::InvariantViolation(format!(
                "Cannot attach media to {} record {} (scraped: {})",
                self.status,
                self.id,
                self.is_scraped()
            )));
        }
        if paths.is_empty() {
            return Err(DomainError::InvariantViolation(
                "Download produced no files".to_string(),
            ));
        }
        self.recover_from_error()?;

        let now = Utc::now();
        self.media_paths = paths;
        self.downloaded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Thumbnails are best-effort and never change status
    pub fn attach_thumbnail(&mut self, path: impl Into<String>) {
        self.thumbnail_path = Some(path.into());
        self.updated_at = Utc::now();
    }
}

// src/services/lifecycle_service.rs
//
// Per-record pipeline steps: validate, scrape, download.
//
// CRITICAL RULES:
// - One call handles exactly one record; failures are written to that record and returned
//   as an outcome, never raised past it
// - Every capability call is bounded by the target timeout
// - Status changes only through PostRecord transition methods via PostStore::update

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    DomainError, PostId, PostRecord, PostStatus, QueryKey, Reachability, TaskKind,
    TransitionOrigin, ValidationReport,
};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, PostMediaDownloaded, PostMetadataScraped, PostStatusChanged};
use crate::integrations::{
    CapabilityError, DownloadRequest, MediaDownloader, MetadataScraper, UrlValidator,
};
use crate::store::{PostStore, StoreLayout};

/// Result of processing one target
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Succeeded(PostRecord),
    Failed { id: PostId, error: String },
    Skipped { id: PostId, reason: String },
}

impl RecordOutcome {
    fn failed(id: &PostId, error: impl ToString) -> Self {
        RecordOutcome::Failed {
            id: id.clone(),
            error: error.to_string(),
        }
    }

    fn skipped(id: &PostId, reason: impl Into<String>) -> Self {
        RecordOutcome::Skipped {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

pub struct LifecycleService {
    store: Arc<PostStore>,
    event_bus: Arc<EventBus>,
    validator: Arc<dyn UrlValidator>,
    scraper: Arc<dyn MetadataScraper>,
    downloader: Arc<dyn MediaDownloader>,
    target_timeout: Duration,
}

impl LifecycleService {
    pub fn new(
        store: Arc<PostStore>,
        event_bus: Arc<EventBus>,
        validator: Arc<dyn UrlValidator>,
        scraper: Arc<dyn MetadataScraper>,
        downloader: Arc<dyn MediaDownloader>,
        target_timeout: Duration,
    ) -> Self {
        Self {
            store,
            event_bus,
            validator,
            scraper,
            downloader,
            target_timeout,
        }
    }

    pub fn store(&self) -> &Arc<PostStore> {
        &self.store
    }

    /// Records a task of `kind` processes when no ids are given
    pub fn default_targets(&self, kind: TaskKind) -> AppResult<Vec<PostId>> {
        let predicate: fn(&QueryKey) -> bool = match kind {
            TaskKind::Validate => |k| matches!(k.status, PostStatus::Pending | PostStatus::Error),
            TaskKind::Scrape => |k| k.status == PostStatus::Accessible && k.scraped_at.is_none(),
            TaskKind::Download => {
                |k| k.status == PostStatus::Accessible && k.scraped_at.is_some() && !k.has_media
            }
        };
        self.store.select(predicate)
    }

    pub async fn process(&self, kind: TaskKind, id: &PostId, origin: TransitionOrigin) -> RecordOutcome {
        match kind {
            TaskKind::Validate => self.validate_post(id, origin).await,
            TaskKind::Scrape => self.scrape_post(id).await,
            TaskKind::Download => self.download_post(id).await,
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CapabilityError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        match tokio::time::timeout(self.target_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Transient(format!(
                "Timed out after {}s",
                self.target_timeout.as_secs()
            ))),
        }
    }

    pub async fn validate_post(&self, id: &PostId, origin: TransitionOrigin) -> RecordOutcome {
        let post = match self.store.require(id) {
            Ok(post) => post,
            Err(e) => return RecordOutcome::failed(id, e),
        };

        if origin == TransitionOrigin::Automated && post.status.is_terminal() {
            return RecordOutcome::skipped(id, format!("{} is terminal", post.status));
        }

        let report = match self.bounded(self.validator.validate(&post.normalized_url)).await {
            Ok(report) => report,
            Err(e) => report_from_failure(e),
        };

        let from = post.status;
        match self
            .store
            .update(id, |record| record.record_validation(&report, origin))
        {
            Ok((record, to)) => {
                self.emit_status_change(id, from, to);
                match (to, &record.error_message) {
                    (PostStatus::Error, Some(message)) => RecordOutcome::failed(id, message),
                    _ => RecordOutcome::Succeeded(record),
                }
            }
            Err(AppError::Domain(e @ DomainError::InvalidStateTransition { .. })) => {
                RecordOutcome::skipped(id, e.to_string())
            }
            Err(e) => RecordOutcome::failed(id, e),
        }
    }

    pub async fn scrape_post(&self, id: &PostId) -> RecordOutcome {
        let post = match self.store.require(id) {
            Ok(post) => post,
            Err(e) => return RecordOutcome::failed(id, e),
        };

        match post.status {
            PostStatus::Accessible => {}
            PostStatus::Error if post.reachability_confirmed() => {}
            PostStatus::Error => {
                return RecordOutcome::skipped(id, "needs validation before scraping");
            }
            status => {
                return RecordOutcome::skipped(id, format!("cannot scrape a {} post", status));
            }
        }

        let metadata = match self
            .bounded(self.scraper.scrape(&post.normalized_url, post.platform))
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => return self.fail(id, post.status, format!("Scrape failed: {}", e)),
        };

        let thumbnail_url = metadata.thumbnail_url.clone();
        let record = match self.store.update(id, |record| record.apply_metadata(metadata)) {
            Ok((record, ())) => record,
            Err(AppError::Domain(
                e @ (DomainError::MetadataRejected { .. } | DomainError::ValidationRequired { .. }),
            )) => {
                log::debug!("Metadata for {} rejected: {}", id, e);
                return RecordOutcome::skipped(id, e.to_string());
            }
            Err(e) => return RecordOutcome::failed(id, e),
        };

        self.emit_status_change(id, post.status, record.status);
        self.event_bus
            .emit(PostMetadataScraped::new(id.clone(), record.author.clone()));

        let record = match thumbnail_url {
            Some(url) => self.fetch_thumbnail(record, &url).await,
            None => record,
        };

        RecordOutcome::Succeeded(record)
    }

    /// Best-effort: failures are logged and the record is returned unchanged.
    async fn fetch_thumbnail(&self, record: PostRecord, url: &str) -> PostRecord {
        let destination = self.layout().thumbnail_path(&record.id);

        if let Err(e) = self
            .bounded(self.downloader.download_thumbnail(url, &destination))
            .await
        {
            log::debug!("Thumbnail for {} not fetched: {}", record.id, e);
            return record;
        }

        let path = destination.to_string_lossy().into_owned();
        match self.store.update(&record.id, |post| {
            post.attach_thumbnail(path);
            Ok(())
        }) {
            Ok((updated, ())) => updated,
            Err(e) => {
                log::warn!("Thumbnail for {} downloaded but not recorded: {}", record.id, e);
                record
            }
        }
    }

    pub async fn download_post(&self, id: &PostId) -> RecordOutcome {
        let post = match self.store.require(id) {
            Ok(post) => post,
            Err(e) => return RecordOutcome::failed(id, e),
        };

        if !post.ready_for_download() {
            let reason = if post.status == PostStatus::Error && !post.reachability_confirmed() {
                "needs validation before downloading".to_string()
            } else {
                format!("{} post not ready for download (scraped: {})", post.status, post.is_scraped())
            };
            return RecordOutcome::skipped(id, reason);
        }

        let request = DownloadRequest {
            url: post.normalized_url.clone(),
            media_urls: post.media_urls.clone(),
            destination_dir: self.layout().author_media_dir(post.author.as_deref()),
            file_stem: StoreLayout::media_stem(post.title.as_deref(), id),
        };

        let paths = match self.bounded(self.downloader.download(&request)).await {
            Ok(paths) => paths,
            Err(e) => return self.fail(id, post.status, format!("Download failed: {}", e)),
        };

        let file_count = paths.len();
        let paths: Vec<String> = paths
            .into_iter()
            .map(|p: PathBuf| p.to_string_lossy().into_owned())
            .collect();

        match self.store.update(id, |record| record.attach_media(paths)) {
            Ok((record, ())) => {
                self.emit_status_change(id, post.status, record.status);
                self.event_bus
                    .emit(PostMediaDownloaded::new(id.clone(), file_count));
                RecordOutcome::Succeeded(record)
            }
            Err(e) => self.fail(id, post.status, format!("Download failed: {}", e)),
        }
    }

    fn layout(&self) -> &StoreLayout {
        self.store.layout()
    }

    /// Write a per-record failure into the record itself
    fn fail(&self, id: &PostId, from: PostStatus, message: String) -> RecordOutcome {
        log::warn!("Post {}: {}", id, message);
        let recorded = message.clone();
        match self.store.update(id, |record| record.record_failure(recorded)) {
            Ok((record, ())) => self.emit_status_change(id, from, record.status),
            Err(e) => log::error!("Could not record failure for {}: {}", id, e),
        }
        RecordOutcome::failed(id, message)
    }

    fn emit_status_change(&self, id: &PostId, from: PostStatus, to: PostStatus) {
        if from != to {
            self.event_bus
                .emit(PostStatusChanged::new(id.clone(), from, to));
        }
    }
}

/// Capability failures become classified reports; only permission and removal are conclusive.
fn report_from_failure(error: CapabilityError) -> ValidationReport {
    match error {
        CapabilityError::PermissionDenied(message) => {
            ValidationReport::classified(Reachability::Private, message)
        }
        CapabilityError::ContentRemoved(message) => {
            ValidationReport::classified(Reachability::Deleted, message)
        }
        other => ValidationReport::classified(Reachability::TransientError, other.to_string()),
    }
}

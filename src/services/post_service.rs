// src/services/post_service.rs
//
// Post CRUD for the foreground path: reads, tag/note edits, deletes.
//
// CRITICAL RULES:
// - Edits go through PostStore::update so a running task never overwrites them
// - Delete reports per-id failures instead of aborting

use std::sync::Arc;

use crate::domain::{PostId, PostPage, PostQuery, PostRecord, PostStatus};
use crate::error::AppResult;
use crate::events::{EventBus, PostsDeleted};
use crate::store::{DeleteReport, PostStore};

pub struct PostService {
    store: Arc<PostStore>,
    event_bus: Arc<EventBus>,
}

impl PostService {
    pub fn new(store: Arc<PostStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }

    pub fn get(&self, id: &PostId) -> AppResult<PostRecord> {
        self.store.require(id)
    }

    pub fn list(&self, query: &PostQuery) -> AppResult<PostPage> {
        self.store.query(query)
    }

    /// Every private or deleted post
    pub fn list_inaccessible(&self) -> AppResult<Vec<PostRecord>> {
        let ids = self
            .store
            .select(|key| matches!(key.status, PostStatus::Private | PostStatus::Deleted))?;
        self.store.get_many(&ids)
    }

    /// Replace the whole tag set
    pub fn set_tags(&self, id: &PostId, tags: Vec<String>) -> AppResult<PostRecord> {
        let (post, ()) = self.store.update(id, |post| {
            post.set_tags(tags);
            Ok(())
        })?;
        Ok(post)
    }

    /// Returns the record and whether the tag was new
    pub fn add_tag(&self, id: &PostId, tag: &str) -> AppResult<(PostRecord, bool)> {
        self.store.update(id, |post| Ok(post.add_tag(tag)))
    }

    pub fn remove_tag(&self, id: &PostId, tag: &str) -> AppResult<(PostRecord, bool)> {
        self.store.update(id, |post| Ok(post.remove_tag(tag)))
    }

    /// `None` or a blank note clears it
    pub fn set_note(&self, id: &PostId, note: Option<String>) -> AppResult<PostRecord> {
        let (post, ()) = self.store.update(id, |post| {
            post.set_note(note);
            Ok(())
        })?;
        Ok(post)
    }

    pub fn delete(&self, ids: &[PostId]) -> AppResult<DeleteReport> {
        let report = self.store.delete(ids)?;

        log::info!(
            "Deleted {} of {} posts ({} errors)",
            report.deleted_count,
            ids.len(),
            report.errors.len()
        );

        if !report.deleted.is_empty() {
            self.event_bus.emit(PostsDeleted::new(report.deleted.clone()));
        }
        Ok(report)
    }
}

// src/store/post_store.rs
//
// Post Record Store
//
// CRITICAL RULES:
// - The ONLY mutation path for post records
// - Every write validates invariants, persists, then updates the index
//   while holding the index write lock, so index and rows never diverge
// - One record per write: no multi-record transactions
// - Reads may run concurrently with a background task

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::index::PostIndex;
use super::layout::StoreLayout;
use crate::domain::{
    validate_post, ArchiveStatistics, DomainResult, FilterVocabulary, MediaType, PostId,
    PostPage, PostQuery, PostRecord, QueryKey,
};
use crate::error::{AppError, AppResult};
use crate::repositories::PostRepository;

/// Per-id failure inside a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub id: String,
    pub message: String,
}

/// Outcome of `PostStore::delete`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted_count: usize,
    pub deleted: Vec<PostId>,
    pub errors: Vec<DeleteFailure>,
}

pub struct PostStore {
    repo: Arc<dyn PostRepository>,
    index: RwLock<PostIndex>,
    layout: StoreLayout,
}

impl PostStore {
    /// Open the store and build the index from persisted records
    pub fn open(repo: Arc<dyn PostRepository>, layout: StoreLayout) -> AppResult<Self> {
        let posts = repo.list_all()?;
        let index = PostIndex::rebuild(&posts);
        log::info!("Post index built with {} records", index.len());

        Ok(Self {
            repo,
            index: RwLock::new(index),
            layout,
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn read_index(&self) -> AppResult<RwLockReadGuard<'_, PostIndex>> {
        self.index
            .read()
            .map_err(|_| AppError::Other("Post index lock poisoned".to_string()))
    }

    fn write_index(&self) -> AppResult<RwLockWriteGuard<'_, PostIndex>> {
        self.index
            .write()
            .map_err(|_| AppError::Other("Post index lock poisoned".to_string()))
    }

    /// Insert or replace a whole record
    pub fn upsert(&self, post: &PostRecord) -> AppResult<()> {
        validate_post(post)?;
        let mut index = self.write_index()?;
        self.repo.save(post)?;
        index.insert(post);
        Ok(())
    }

    /// Insert only if absent. Returns false when a record with the id already exists.
    pub fn insert_if_absent(&self, post: &PostRecord) -> AppResult<bool> {
        validate_post(post)?;
        let mut index = self.write_index()?;
        if index.contains(&post.id) {
            return Ok(false);
        }
        self.repo.save(post)?;
        index.insert(post);
        Ok(true)
    }

    /// Read-modify-write of one record against its latest persisted state.
    ///
    /// `change` runs under the store write lock; if it fails nothing is written.
    pub fn update<T, F>(&self, id: &PostId, change: F) -> AppResult<(PostRecord, T)>
    where
        F: FnOnce(&mut PostRecord) -> DomainResult<T>,
    {
        let mut index = self.write_index()?;
        let mut post = self
            .repo
            .get_by_id(id)?
            .ok_or_else(|| AppError::PostNotFound(id.clone()))?;

        let value = change(&mut post)?;
        validate_post(&post)?;

        self.repo.save(&post)?;
        index.insert(&post);
        Ok((post, value))
    }

    pub fn get(&self, id: &PostId) -> AppResult<Option<PostRecord>> {
        self.repo.get_by_id(id)
    }

    pub fn require(&self, id: &PostId) -> AppResult<PostRecord> {
        self.get(id)?
            .ok_or_else(|| AppError::PostNotFound(id.clone()))
    }

    pub fn exists(&self, id: &PostId) -> AppResult<bool> {
        Ok(self.read_index()?.contains(id))
    }

    pub fn count(&self) -> AppResult<usize> {
        Ok(self.read_index()?.len())
    }

    pub fn query(&self, query: &PostQuery) -> AppResult<PostPage> {
        let (ids, total) = self.read_index()?.query(query);
        let records = self.repo.get_many(&ids)?;

        if records.len() != ids.len() {
            log::warn!(
                "Post index returned {} ids but only {} records were loaded; consider reindex",
                ids.len(),
                records.len()
            );
        }

        Ok(PostPage {
            records,
            total,
            limit: query.effective_limit(),
            offset: query.offset,
        })
    }

    /// Ids whose index entry satisfies `predicate`
    pub fn select<F>(&self, predicate: F) -> AppResult<Vec<PostId>>
    where
        F: Fn(&QueryKey) -> bool,
    {
        Ok(self.read_index()?.select(predicate))
    }

    /// Records for `ids`, in order; unknown ids are skipped
    pub fn get_many(&self, ids: &[PostId]) -> AppResult<Vec<PostRecord>> {
        self.repo.get_many(ids)
    }

    pub fn all(&self) -> AppResult<Vec<PostRecord>> {
        self.repo.list_all()
    }

    pub fn vocabulary(&self) -> AppResult<FilterVocabulary> {
        let index = self.read_index()?;
        Ok(FilterVocabulary {
            platforms: index.platforms(),
            statuses: index.statuses(),
            media_types: vec![MediaType::Image, MediaType::Video, MediaType::Carousel],
            authors: index.authors(),
            tags: index.tags(),
        })
    }

    pub fn statistics(&self) -> AppResult<ArchiveStatistics> {
        let posts = self.repo.list_all()?;
        Ok(ArchiveStatistics::from_posts(&posts))
    }

    /// Rebuild the index from persisted records. Returns the record count.
    pub fn reindex(&self) -> AppResult<usize> {
        let mut index = self.write_index()?;
        let posts = self.repo.list_all()?;
        *index = PostIndex::rebuild(&posts);
        log::info!("Reindexed {} posts", index.len());
        Ok(index.len())
    }

    /// Delete records together with their media and thumbnail files.
    ///
    /// Failures are reported per id; the remaining ids are still processed.
    /// A record whose files cannot be removed is kept so nothing is orphaned.
    pub fn delete(&self, ids: &[PostId]) -> AppResult<DeleteReport> {
        let mut report = DeleteReport::default();

        for id in ids {
            match self.delete_one(id) {
                Ok(()) => {
                    report.deleted_count += 1;
                    report.deleted.push(id.clone());
                }
                Err(e) => {
                    log::warn!("Failed to delete post {}: {}", id, e);
                    report.errors.push(DeleteFailure {
                        id: id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn delete_one(&self, id: &PostId) -> AppResult<()> {
        let mut index = self.write_index()?;
        let post = self
            .repo
            .get_by_id(id)?
            .ok_or_else(|| AppError::PostNotFound(id.clone()))?;

        let mut files: Vec<String> = post.media_paths.clone();
        files.extend(post.thumbnail_path.clone());
        files.push(self.layout.thumbnail_path(id).to_string_lossy().into_owned());
        files.sort();
        files.dedup();

        for file in &files {
            remove_file_if_present(Path::new(file))?;
        }

        self.repo.delete(id)?;
        index.remove(id);
        log::debug!("Deleted post {} and {} associated files", id, files.len());
        Ok(())
    }
}

fn remove_file_if_present(path: &Path) -> AppResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))),
    }
}

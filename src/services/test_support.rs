// src/services/test_support.rs
//
// Shared fixtures for the service test suites: a temp archive, a notes folder
// and helpers to wire services over capability doubles.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::db::{create_connection_pool, initialize_database};
use crate::domain::{normalize, PostId, PostRecord};
use crate::events::EventBus;
use crate::integrations::{MediaDownloader, MetadataScraper, UrlValidator};
use crate::repositories::SqlitePostRepository;
use crate::services::{LifecycleService, OrchestratorSettings, TaskOrchestrator};
use crate::store::{PostStore, StoreLayout};

pub(crate) struct Harness {
    pub dir: TempDir,
    pub store: Arc<PostStore>,
    pub event_bus: Arc<EventBus>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path().join("data"));
        layout.ensure().unwrap();

        let pool = create_connection_pool(&layout.database_path()).unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        let repo = Arc::new(SqlitePostRepository::new(Arc::new(pool)));
        let store = Arc::new(PostStore::open(repo, layout).unwrap());

        std::fs::create_dir_all(dir.path().join("notes")).unwrap();

        Self {
            dir,
            store,
            event_bus: Arc::new(EventBus::new()),
        }
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.dir.path().join("notes")
    }

    pub fn write_note(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.notes_dir().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Insert a pending stub for `url` and return its id
    pub fn stub(&self, url: &str) -> PostId {
        let post = PostRecord::stub(url, &normalize(url), "notes.md", None);
        self.store.upsert(&post).unwrap();
        post.id
    }

    pub fn lifecycle(
        &self,
        validator: impl UrlValidator + 'static,
        scraper: impl MetadataScraper + 'static,
        downloader: impl MediaDownloader + 'static,
        target_timeout: Duration,
    ) -> Arc<LifecycleService> {
        Arc::new(LifecycleService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.event_bus),
            Arc::new(validator),
            Arc::new(scraper),
            Arc::new(downloader),
            target_timeout,
        ))
    }

    pub fn orchestrator(&self, lifecycle: Arc<LifecycleService>) -> TaskOrchestrator {
        TaskOrchestrator::new(
            lifecycle,
            Arc::clone(&self.event_bus),
            OrchestratorSettings {
                worker_count: 2,
                request_delay: Duration::ZERO,
                recent_capacity: 3,
            },
        )
    }
}

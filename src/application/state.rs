// src/application/state.rs
//
// Application state and bootstrap wiring.
//
// Order matters:
// 1. Infrastructure (layout, config, pool, schema)
// 2. Repositories
// 3. Store (index built from persisted records)
// 4. Services
// 5. Event handler registration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigStore;
use crate::db::{create_connection_pool, initialize_database};
use crate::error::AppResult;
use crate::events::{register_statistics_handlers, EventBus};
use crate::integrations::{
    CookieSource, FileManager, HttpValidator, MediaDownloader, MetadataScraper,
    SystemFileManager, UrlValidator, YtDlpClient,
};
use crate::repositories::{
    PostRepository, SqlitePostRepository, SqliteStatisticsRepository, StatisticsRepository,
};
use crate::services::{
    LifecycleService, OrchestratorSettings, PostService, ScanService, StatisticsService,
    TaskOrchestrator,
};
use crate::store::{PostStore, StoreLayout};

/// External capabilities the pipeline is wired with
pub struct Capabilities {
    pub validator: Arc<dyn UrlValidator>,
    pub scraper: Arc<dyn MetadataScraper>,
    pub downloader: Arc<dyn MediaDownloader>,
    pub file_manager: Arc<dyn FileManager>,
}

impl Capabilities {
    /// HTTP validator, yt-dlp scraper/downloader and the OS file manager
    pub fn system(cookies: CookieSource, request_timeout: Duration) -> AppResult<Self> {
        let ytdlp = Arc::new(YtDlpClient::new(cookies, request_timeout)?);
        Ok(Self {
            validator: Arc::new(HttpValidator::new(request_timeout)?),
            scraper: ytdlp.clone(),
            downloader: ytdlp,
            file_manager: Arc::new(SystemFileManager::new()),
        })
    }
}

/// Application state.
/// All fields are Arc-wrapped for thread-safe sharing across commands.
pub struct AppState {
    pub layout: StoreLayout,
    pub config: Arc<ConfigStore>,
    pub event_bus: Arc<EventBus>,
    pub store: Arc<PostStore>,
    pub scan_service: Arc<ScanService>,
    pub post_service: Arc<PostService>,
    pub statistics_service: Arc<StatisticsService>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub file_manager: Arc<dyn FileManager>,
}

impl AppState {
    /// Open the archive at `data_dir` with the real capabilities.
    ///
    /// Credentials are read here once; changing them needs a restart.
    pub fn open(data_dir: PathBuf) -> AppResult<Self> {
        let layout = StoreLayout::new(data_dir);
        layout.ensure()?;
        let config = ConfigStore::load(layout.config_path())?;

        let current = config.get();
        let timeout = Duration::from_secs(current.tasks.target_timeout_secs);
        let capabilities = Capabilities::system(CookieSource::from(&current.auth), timeout)?;

        Self::with_capabilities(layout, config, capabilities)
    }

    pub fn with_capabilities(
        layout: StoreLayout,
        config: ConfigStore,
        capabilities: Capabilities,
    ) -> AppResult<Self> {
        // 1. INFRASTRUCTURE
        layout.ensure()?;
        let event_bus = Arc::new(EventBus::new());
        let pool = Arc::new(create_connection_pool(&layout.database_path())?);
        {
            let conn = pool.get()?;
            initialize_database(&conn)?;
        }
        let settings = config.get().tasks;

        // 2. REPOSITORIES
        let post_repo: Arc<dyn PostRepository> = Arc::new(SqlitePostRepository::new(pool.clone()));
        let statistics_repo: Arc<dyn StatisticsRepository> =
            Arc::new(SqliteStatisticsRepository::new(pool.clone()));

        // 3. STORE
        let store = Arc::new(PostStore::open(post_repo, layout.clone())?);

        // 4. SERVICES
        let scan_service = Arc::new(ScanService::new(store.clone(), event_bus.clone()));
        let post_service = Arc::new(PostService::new(store.clone(), event_bus.clone()));
        let statistics_service = Arc::new(StatisticsService::new(statistics_repo, store.clone()));
        let lifecycle = Arc::new(LifecycleService::new(
            store.clone(),
            event_bus.clone(),
            capabilities.validator,
            capabilities.scraper,
            capabilities.downloader,
            Duration::from_secs(settings.target_timeout_secs.max(1)),
        ));
        let orchestrator = Arc::new(TaskOrchestrator::new(
            lifecycle,
            event_bus.clone(),
            OrchestratorSettings {
                worker_count: settings.worker_count,
                request_delay: Duration::from_millis(settings.request_delay_ms),
                recent_capacity: settings.recent_capacity,
            },
        ));

        // 5. EVENT HANDLER REGISTRATION (WIRING)
        register_statistics_handlers(&event_bus, statistics_service.clone());

        log::info!("Archive opened at {}", layout.root().display());

        Ok(Self {
            layout,
            config: Arc::new(config),
            event_bus,
            store,
            scan_service,
            post_service,
            statistics_service,
            orchestrator,
            file_manager: capabilities.file_manager,
        })
    }
}

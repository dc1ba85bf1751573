// src/services/statistics_service.rs
//
// Derived statistics. Snapshots are a cache of the post records, never a source of truth.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    ArchiveStatistics, FilterVocabulary, Platform, PostRecord, StatisticsSnapshot,
    StatisticsType,
};
use crate::error::AppResult;
use crate::repositories::StatisticsRepository;
use crate::store::PostStore;

pub struct StatisticsService {
    statistics_repo: Arc<dyn StatisticsRepository>,
    store: Arc<PostStore>,
}

impl StatisticsService {
    pub fn new(statistics_repo: Arc<dyn StatisticsRepository>, store: Arc<PostStore>) -> Self {
        Self {
            statistics_repo,
            store,
        }
    }

    /// Live statistics, computed from the records
    pub fn calculate(&self) -> AppResult<ArchiveStatistics> {
        self.store.statistics()
    }

    /// Recompute global and per-platform statistics and store them as snapshots.
    pub fn refresh_snapshot(&self) -> AppResult<ArchiveStatistics> {
        let posts = self.store.all()?;
        let global = ArchiveStatistics::from_posts(&posts);

        self.statistics_repo.save_snapshot(&StatisticsSnapshot::new(
            StatisticsType::Global,
            serde_json::to_value(&global)?,
        ))?;

        let mut by_platform: BTreeMap<Platform, Vec<&PostRecord>> = BTreeMap::new();
        for post in &posts {
            by_platform.entry(post.platform).or_default().push(post);
        }
        for (platform, platform_posts) in by_platform {
            let stats = ArchiveStatistics::from_posts(platform_posts);
            self.statistics_repo.save_snapshot(&StatisticsSnapshot::new(
                StatisticsType::ByPlatform { platform },
                serde_json::to_value(&stats)?,
            ))?;
        }

        Ok(global)
    }

    pub fn latest(&self, kind: StatisticsType) -> AppResult<Option<StatisticsSnapshot>> {
        self.statistics_repo.get_latest(kind)
    }

    pub fn vocabulary(&self) -> AppResult<FilterVocabulary> {
        self.store.vocabulary()
    }
}

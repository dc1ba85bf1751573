use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::link::Platform;
use crate::domain::post::{MediaType, PostRecord, PostStatus};
use crate::domain::DomainError;

/// Number of authors listed in `top_authors`
pub const TOP_AUTHORS_LIMIT: usize = 20;

/// Represents a derived statistics snapshot
/// Statistics are NEVER a source of truth and can be recalculated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub id: Uuid,
    pub kind: StatisticsType,
    /// The actual data (stored as JSON for flexibility)
    pub value: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

/// Scope a snapshot was computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsType {
    /// Whole archive
    Global,
    /// Posts of one platform only
    ByPlatform { platform: Platform },
}

impl StatisticsSnapshot {
    pub fn new(kind: StatisticsType, value: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            value,
            generated_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for StatisticsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatisticsType::Global => write!(f, "global"),
            StatisticsType::ByPlatform { platform } => write!(f, "platform:{}", platform),
        }
    }
}

impl FromStr for StatisticsType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(StatisticsType::Global);
        }
        match s.strip_prefix("platform:") {
            Some(platform) => Ok(StatisticsType::ByPlatform {
                platform: platform.parse()?,
            }),
            None => Err(DomainError::InvariantViolation(format!(
                "Unknown statistics type '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: usize,
}

/// Summary of the archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStatistics {
    pub total: usize,
    pub by_status: BTreeMap<PostStatus, usize>,
    pub by_platform: BTreeMap<Platform, usize>,
    pub by_media_type: BTreeMap<MediaType, usize>,
    /// Most frequent authors, count descending then name ascending
    pub top_authors: Vec<AuthorCount>,
    pub scraped: usize,
    pub with_media: usize,
    pub tagged: usize,
}

impl ArchiveStatistics {
    pub fn from_posts<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a PostRecord>,
    {
        let mut stats = Self::default();
        let mut authors: BTreeMap<&str, usize> = BTreeMap::new();

        for post in posts {
            stats.total += 1;
            *stats.by_status.entry(post.status).or_default() += 1;
            *stats.by_platform.entry(post.platform).or_default() += 1;
            if let Some(mt) = post.media_type {
                *stats.by_media_type.entry(mt).or_default() += 1;
            }
            if let Some(author) = post.author.as_deref() {
                *authors.entry(author).or_default() += 1;
            }
            if post.is_scraped() {
                stats.scraped += 1;
            }
            if post.has_media() {
                stats.with_media += 1;
            }
            if !post.tags.is_empty() {
                stats.tagged += 1;
            }
        }

        let mut ranked: Vec<AuthorCount> = authors
            .into_iter()
            .map(|(author, count)| AuthorCount {
                author: author.to_string(),
                count,
            })
            .collect();
        // BTreeMap iteration is already name-ascending; stable sort keeps it for ties.
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(TOP_AUTHORS_LIMIT);
        stats.top_authors = ranked;

        stats
    }
}

/// Values the UI can offer as filter choices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterVocabulary {
    pub platforms: Vec<Platform>,
    pub statuses: Vec<PostStatus>,
    pub media_types: Vec<MediaType>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
}

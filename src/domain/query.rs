// src/domain/query.rs
//
// Query vocabulary for paginated, filtered, sorted views over posts.
//
// RULES:
// - Different fields combine with AND, values within one field with OR
// - Sort ties are broken by id ascending so pages are deterministic
// - Missing sort values order below every present value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::domain::link::Platform;
use crate::domain::post::{MediaType, PostId, PostRecord, PostStatus};
use crate::domain::DomainError;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    PostedAt,
    Views,
    Likes,
    #[default]
    ScrapedAt,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posted_at" => Ok(SortField::PostedAt),
            "views" => Ok(SortField::Views),
            "likes" => Ok(SortField::Likes),
            "scraped_at" => Ok(SortField::ScrapedAt),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown sort field '{}'",
                other
            ))),
        }
    }
}

/// A post query. Empty filter vectors mean "no constraint".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostQuery {
    pub statuses: Vec<PostStatus>,
    pub platforms: Vec<Platform>,
    pub authors: Vec<String>,
    pub media_types: Vec<MediaType>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_desc: bool,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            platforms: Vec::new(),
            authors: Vec::new(),
            media_types: Vec::new(),
            tag: None,
            search: None,
            sort_by: SortField::ScrapedAt,
            sort_desc: true,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl PostQuery {
    /// Limit clamped to `1..=MAX_PAGE_LIMIT`
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// One page of results plus the full filtered count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub records: Vec<PostRecord>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Fields of a post the query layer filters and sorts on
#[derive(Debug, Clone, PartialEq)]
pub struct QueryKey {
    pub id: PostId,
    pub status: PostStatus,
    pub platform: Platform,
    pub author: Option<String>,
    pub media_type: Option<MediaType>,
    pub tags: Vec<String>,
    /// Lower-cased content, title and url joined for substring search
    pub haystack: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub has_media: bool,
}

impl From<&PostRecord> for QueryKey {
    fn from(post: &PostRecord) -> Self {
        let haystack = [
            post.content.as_deref(),
            post.title.as_deref(),
            Some(post.url.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

        Self {
            id: post.id.clone(),
            status: post.status,
            platform: post.platform,
            author: post.author.clone(),
            media_type: post.media_type,
            tags: post.tags.iter().cloned().collect(),
            haystack,
            posted_at: post.posted_at,
            views: post.views,
            likes: post.likes,
            scraped_at: post.scraped_at,
            has_media: post.has_media(),
        }
    }
}

impl QueryKey {
    pub fn matches(&self, query: &PostQuery) -> bool {
        if !query.statuses.is_empty() && !query.statuses.contains(&self.status) {
            return false;
        }
        if !query.platforms.is_empty() && !query.platforms.contains(&self.platform) {
            return false;
        }
        if !query.authors.is_empty() {
            match &self.author {
                Some(author) if query.authors.iter().any(|a| a == author) => {}
                _ => return false,
            }
        }
        if !query.media_types.is_empty() {
            match self.media_type {
                Some(mt) if query.media_types.contains(&mt) => {}
                _ => return false,
            }
        }
        if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !self.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !self.haystack.contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }

    fn sort_value(&self, field: SortField) -> Option<i64> {
        match field {
            SortField::PostedAt => self.posted_at.map(|t| t.timestamp_millis()),
            SortField::ScrapedAt => self.scraped_at.map(|t| t.timestamp_millis()),
            SortField::Views => self.views.map(saturating_i64),
            SortField::Likes => self.likes.map(saturating_i64),
        }
    }
}

fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Total order used by every query: requested field, then id ascending.
pub fn compare_keys(a: &QueryKey, b: &QueryKey, field: SortField, desc: bool) -> Ordering {
    // Option orders None below Some, which is the null rule we want.
    let primary = a.sort_value(field).cmp(&b.sort_value(field));
    let primary = if desc { primary.reverse() } else { primary };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::link::normalize;

    fn key(n: u32, likes: Option<u64>) -> QueryKey {
        let url = format!("https://instagram.com/p/K{}", n);
        let normalized = normalize(&url);
        let mut post = PostRecord::stub(&url, &normalized, "a.md", None);
        post.likes = likes;
        post.status = PostStatus::Accessible;
        QueryKey::from(&post)
    }

    #[test]
    fn test_nulls_sort_lowest() {
        let with = key(1, Some(1));
        let without = key(2, None);
        assert_eq!(compare_keys(&with, &without, SortField::Likes, true), Ordering::Less);
        assert_eq!(compare_keys(&with, &without, SortField::Likes, false), Ordering::Greater);
    }

    #[test]
    fn test_ties_break_on_id_ascending() {
        let a = key(1, Some(5));
        let b = key(2, Some(5));
        let expected = a.id.cmp(&b.id);
        assert_eq!(compare_keys(&a, &b, SortField::Likes, true), expected);
        assert_eq!(compare_keys(&a, &b, SortField::Likes, false), expected);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let k = key(1, None);
        let query = PostQuery {
            search: Some("INSTAGRAM.com/P/k1".to_string()),
            ..Default::default()
        };
        assert!(k.matches(&query));
    }

    #[test]
    fn test_or_within_field_and_across_fields() {
        let k = key(1, None);
        let hit = PostQuery {
            statuses: vec![PostStatus::Private, PostStatus::Accessible],
            platforms: vec![Platform::Instagram],
            ..Default::default()
        };
        assert!(k.matches(&hit));

        let miss = PostQuery {
            statuses: vec![PostStatus::Accessible],
            platforms: vec![Platform::Threads],
            ..Default::default()
        };
        assert!(!k.matches(&miss));
    }

    #[test]
    fn test_author_filter_excludes_unknown_author() {
        let k = key(1, None);
        let query = PostQuery {
            authors: vec!["someone".to_string()],
            ..Default::default()
        };
        assert!(!k.matches(&query));
    }

    #[test]
    fn test_limit_is_clamped() {
        let q = PostQuery {
            limit: 10_000,
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), MAX_PAGE_LIMIT);
    }
}

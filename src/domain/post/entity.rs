use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::transitions::Reachability;
use crate::domain::link::{NormalizedUrl, Platform};
use crate::domain::{DomainError, DomainResult};

/// Length of the hex identity derived from a normalized URL
const POST_ID_LEN: usize = 12;

/// Content-addressed identity of a post.
/// Always derived from the normalized URL, never generated randomly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn from_normalized(normalized_url: &str) -> Self {
        let digest = Sha256::digest(normalized_url.as_bytes());
        let hex = format!("{:x}", digest);
        Self(hex[..POST_ID_LEN].to_string())
    }

    /// Parse an id supplied from outside (CLI, UI)
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == POST_ID_LEN
            && raw.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        if !well_formed {
            return Err(DomainError::InvariantViolation(format!(
                "Malformed post id '{}'",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a tracked URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Accessible,
    Private,
    Deleted,
    Error,
}

impl PostStatus {
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Pending,
        PostStatus::Accessible,
        PostStatus::Private,
        PostStatus::Deleted,
        PostStatus::Error,
    ];

    /// No automated transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Private | PostStatus::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Accessible => "accessible",
            PostStatus::Private => "private",
            PostStatus::Deleted => "deleted",
            PostStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PostStatus::Pending),
            "accessible" => Ok(PostStatus::Accessible),
            "private" => Ok(PostStatus::Private),
            "deleted" => Ok(PostStatus::Deleted),
            // Older archives used "failed" for the error state
            "error" | "failed" => Ok(PostStatus::Error),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown post status '{}'",
                other
            ))),
        }
    }
}

/// Kind of media a post carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Carousel,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Carousel => "carousel",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "carousel" => Ok(MediaType::Carousel),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown media type '{}'",
                other
            ))),
        }
    }
}

/// Structured fields produced by a successful scrape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub media_urls: Vec<String>,
    pub media_type: Option<MediaType>,
}

/// One tracked URL and everything known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Pure function of `normalized_url`
    pub id: PostId,

    /// URL exactly as first seen
    pub url: String,
    pub normalized_url: String,
    pub platform: Platform,
    pub status: PostStatus,

    /// Provenance: document where the URL was first found
    pub source_file: String,
    pub source_context: Option<String>,

    // Scraped metadata (null until a successful scrape)
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub media_type: Option<MediaType>,

    // Media
    pub media_paths: Vec<String>,
    pub media_urls: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<String>,

    // User-owned, independent of pipeline stage
    pub tags: BTreeSet<String>,
    pub note: Option<String>,

    pub error_message: Option<String>,
    /// Classification from the most recent validation
    pub last_reachability: Option<Reachability>,

    pub validated_at: Option<DateTime<Utc>>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRecord {
    /// Create a stub: only URL and provenance are known, status is `pending`.
    pub fn stub(
        url: impl Into<String>,
        normalized: &NormalizedUrl,
        source_file: impl Into<String>,
        source_context: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: normalized.post_id(),
            url: url.into(),
            normalized_url: normalized.value.clone(),
            platform: normalized.platform,
            status: PostStatus::Pending,
            source_file: source_file.into(),
            source_context,
            author: None,
            author_url: None,
            title: None,
            content: None,
            posted_at: None,
            views: None,
            likes: None,
            comments: None,
            shares: None,
            media_type: None,
            media_paths: Vec::new(),
            media_urls: Vec::new(),
            thumbnail_url: None,
            thumbnail_path: None,
            tags: BTreeSet::new(),
            note: None,
            error_message: None,
            last_reachability: None,
            validated_at: None,
            scraped_at: None,
            downloaded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.author.is_some()
            || self.author_url.is_some()
            || self.title.is_some()
            || self.content.is_some()
            || self.posted_at.is_some()
            || self.views.is_some()
            || self.likes.is_some()
            || self.comments.is_some()
            || self.shares.is_some()
            || self.media_type.is_some()
    }

    pub fn has_media(&self) -> bool {
        !self.media_paths.is_empty()
    }

    pub fn is_scraped(&self) -> bool {
        self.scraped_at.is_some()
    }

    /// Replace the tag set. Tags are trimmed, empties dropped, duplicates collapse.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .filter_map(|t| clean_tag(t.as_ref()))
            .collect();
        self.updated_at = Utc::now();
    }

    /// Add one tag. Returns false when it was already present (or blank).
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let added = match clean_tag(tag) {
            Some(tag) => self.tags.insert(tag),
            None => false,
        };
        if added {
            self.updated_at = Utc::now();
        }
        added
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.tags.remove(tag.trim());
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note.filter(|n| !n.trim().is_empty());
        self.updated_at = Utc::now();
    }
}

fn clean_tag(raw: &str) -> Option<String> {
    let tag = raw.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::link::normalize;

    #[test]
    fn test_post_id_is_stable_hex() {
        let a = PostId::from_normalized("https://instagram.com/p/ABC123");
        let b = PostId::from_normalized("https://instagram.com/p/ABC123");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 12);
        assert!(PostId::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_post_id_parse_rejects_garbage() {
        assert!(PostId::parse("xyz").is_err());
        assert!(PostId::parse("ABCDEF123456").is_err());
    }

    #[test]
    fn test_stub_starts_pending_and_empty() {
        let n = normalize("https://instagram.com/p/ABC123/?utm_source=ig");
        let post = PostRecord::stub("https://instagram.com/p/ABC123/?utm_source=ig", &n, "/notes/a.md", None);
        assert_eq!(post.status, PostStatus::Pending);
        assert_eq!(post.id, n.post_id());
        assert_eq!(post.url, "https://instagram.com/p/ABC123/?utm_source=ig");
        assert!(!post.has_metadata());
        assert!(post.media_paths.is_empty());
    }

    #[test]
    fn test_tags_behave_as_a_set() {
        let n = normalize("https://instagram.com/p/T1");
        let mut post = PostRecord::stub("https://instagram.com/p/T1", &n, "a.md", None);
        post.set_tags(["design", " design ", "", "ux"]);
        assert_eq!(post.tags.len(), 2);
        assert!(!post.add_tag("ux"));
        assert!(post.add_tag("ref"));
        assert!(post.remove_tag("design"));
        assert_eq!(post.tags.iter().cloned().collect::<Vec<_>>(), vec!["ref", "ux"]);
    }

    #[test]
    fn test_legacy_failed_status_reads_as_error() {
        assert_eq!("failed".parse::<PostStatus>().unwrap(), PostStatus::Error);
    }
}

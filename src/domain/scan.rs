use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::link::Platform;
use crate::domain::post::PostId;

/// Cap on the number of duplicate groups reported per scan
pub const DUPLICATE_LIST_LIMIT: usize = 50;

/// Whether a scanned URL was already in the store before this scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlState {
    New,
    Existing,
}

/// One distinct URL found during a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedUrl {
    pub id: PostId,
    pub url: String,
    pub normalized_url: String,
    pub platform: Platform,
    /// First document the URL appeared in
    pub source_file: String,
    pub line: usize,
    pub state: UrlState,
}

/// A normalized URL seen more than once in a single scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub normalized_url: String,
    pub occurrences: usize,
    pub files: Vec<String>,
}

/// A document that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: String,
    pub message: String,
}

/// Ephemeral report of one scan invocation (never persisted)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub source_dir: String,
    pub files_scanned: usize,
    /// Every occurrence, duplicates included
    pub total_urls: usize,
    pub unique_urls: usize,
    pub new_urls: usize,
    pub existing_urls: usize,
    /// `total_urls - unique_urls`
    pub duplicates: usize,
    pub by_platform: BTreeMap<Platform, usize>,
    pub urls: Vec<ScannedUrl>,
    pub duplicate_list: Vec<DuplicateGroup>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Default::default()
        }
    }

    pub fn new_ids(&self) -> Vec<PostId> {
        self.urls
            .iter()
            .filter(|u| u.state == UrlState::New)
            .map(|u| u.id.clone())
            .collect()
    }
}

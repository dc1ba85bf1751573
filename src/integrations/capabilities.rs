// src/integrations/capabilities.rs
//
// Capability contracts consumed by the post pipeline.
//
// CRITICAL RULES:
// - Capabilities never touch the store; they only return data or a typed failure
// - Implementations must be cancel-safe: the caller wraps every call in a timeout
// - Network-bound calls receive the normalized URL

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::domain::{Platform, PostMetadata, ValidationReport};
use crate::error::AppError;

/// Typed failure of an external capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// Retryable (network, rate limit, timeout); never classifies a post as private/deleted
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Content removed: {0}")]
    ContentRemoved(String),

    #[error("Unparseable response: {0}")]
    Parse(String),

    /// Tool missing or URL shape not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<CapabilityError> for AppError {
    fn from(err: CapabilityError) -> Self {
        AppError::Capability(err.to_string())
    }
}

/// `validate(url) -> {reachable, classification}`
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UrlValidator: Send + Sync {
    async fn validate(&self, url: &str) -> Result<ValidationReport, CapabilityError>;
}

/// `scrape(url) -> metadata | typed failure`
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataScraper: Send + Sync {
    async fn scrape(&self, url: &str, platform: Platform) -> Result<PostMetadata, CapabilityError>;
}

/// Where and how to store one post's media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Remote fallbacks from the scrape, tried when the primary download fails
    pub media_urls: Vec<String>,
    pub destination_dir: PathBuf,
    /// Unique per post, so concurrent downloads never share a path
    pub file_stem: String,
}

/// `download(url, destination_dir) -> local file paths | typed failure`
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<PathBuf>, CapabilityError>;

    async fn download_thumbnail(&self, url: &str, destination: &Path) -> Result<(), CapabilityError>;
}

/// `open_in_file_manager(path)`, best-effort and OS-level
#[cfg_attr(test, automock)]
pub trait FileManager: Send + Sync {
    fn open(&self, path: &Path) -> Result<(), CapabilityError>;
}

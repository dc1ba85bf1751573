use std::path::{Path, PathBuf};

use crate::db::DATABASE_FILE;
use crate::domain::PostId;
use crate::error::AppResult;

pub const CONFIG_FILE: &str = "config.json";
const MEDIA_DIR: &str = "media";
const THUMBNAILS_DIR: &str = "thumbnails";
const UNKNOWN_AUTHOR: &str = "unknown";

/// Longest path component produced by `sanitize_component`
const MAX_COMPONENT_CHARS: usize = 100;

/// On-disk layout of an archive data directory:
///
/// ```text
/// <root>/postkeeper.db
/// <root>/config.json
/// <root>/media/<author>/<title>-<id>.<ext>
/// <root>/thumbnails/<id>.jpg
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `dirs::data_dir()/postkeeper`, falling back to the working directory
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postkeeper")
    }

    /// Create the directory skeleton
    pub fn ensure(&self) -> AppResult<()> {
        std::fs::create_dir_all(self.media_dir())?;
        std::fs::create_dir_all(self.thumbnails_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join(MEDIA_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR)
    }

    pub fn thumbnail_path(&self, id: &PostId) -> PathBuf {
        self.thumbnails_dir().join(format!("{}.jpg", id))
    }

    /// Per-author media directory
    pub fn author_media_dir(&self, author: Option<&str>) -> PathBuf {
        let name = author
            .map(sanitize_component)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        self.media_dir().join(name)
    }

    /// File stem for a post's media: `<title>-<id>`, unique per record
    pub fn media_stem(title: Option<&str>, id: &PostId) -> String {
        match title.map(sanitize_component).filter(|s| !s.is_empty()) {
            Some(title) => format!("{}-{}", title, id),
            None => id.to_string(),
        }
    }
}

/// Keep letters, digits and ` ._-()`; everything else is dropped.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || " ._-()".contains(*c))
        .take(MAX_COMPONENT_CHARS)
        .collect();
    cleaned.trim().trim_matches('.').trim().to_string()
}

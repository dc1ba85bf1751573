// src/integrations/ytdlp/client.rs
//
// yt-dlp Integration
//
// ARCHITECTURE:
// - Metadata: `yt-dlp --dump-json --no-download`, one JSON object per item
// - Media: `yt-dlp -o <dir>/<stem>.%(ext)s`, final paths read from `--print`
// - Direct HTTP fetch of the scraped media URLs when yt-dlp cannot download
// - Maps external JSON → PostMetadata (NO store access)
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Child processes are killed when the calling future is dropped (timeouts)
// - Login/private failures map to PermissionDenied, never Transient

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::{MediaType, Platform, PostMetadata};
use crate::integrations::capabilities::{
    CapabilityError, DownloadRequest, MediaDownloader, MetadataScraper,
};

const STDERR_PREVIEW_CHARS: usize = 200;

/// Session cookies handed to yt-dlp for login-walled platforms
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookieSource {
    #[default]
    None,
    /// `--cookies-from-browser <name>`
    Browser(String),
    /// `--cookies <file>` (Netscape format)
    File(PathBuf),
}

impl CookieSource {
    fn args(&self) -> Vec<String> {
        match self {
            CookieSource::None => Vec::new(),
            CookieSource::Browser(name) => {
                vec!["--cookies-from-browser".to_string(), name.clone()]
            }
            CookieSource::File(path) => {
                vec!["--cookies".to_string(), path.to_string_lossy().into_owned()]
            }
        }
    }
}

/// Subset of the yt-dlp info JSON we read
#[derive(Debug, Default, Deserialize)]
struct YtDlpInfo {
    uploader: Option<String>,
    channel: Option<String>,
    uploader_url: Option<String>,
    channel_url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    upload_date: Option<String>,
    timestamp: Option<f64>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    repost_count: Option<u64>,
    thumbnail: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    url: Option<String>,
    height: Option<u32>,
}

impl YtDlpInfo {
    fn best_media_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        self.formats
            .iter()
            .filter(|f| f.url.is_some())
            .max_by_key(|f| f.height.unwrap_or(0))
            .and_then(|f| f.url.clone())
    }
}

pub struct YtDlpClient {
    binary: String,
    cookies: CookieSource,
    http_client: Client,
}

impl YtDlpClient {
    pub fn new(cookies: CookieSource, request_timeout: Duration) -> Result<Self, CapabilityError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CapabilityError::Unsupported(format!("HTTP client: {}", e)))?;

        Ok(Self {
            binary: "yt-dlp".to_string(),
            cookies,
            http_client,
        })
    }

    /// Override the executable (tests, custom installs)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: Vec<String>) -> Result<String, CapabilityError> {
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    CapabilityError::Unsupported(format!("{} not installed", self.binary))
                }
                _ => CapabilityError::Transient(format!("{} failed to start: {}", self.binary, e)),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(classify_failure(&String::from_utf8_lossy(&output.stderr)))
        }
    }

    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<(), CapabilityError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CapabilityError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => CapabilityError::PermissionDenied(format!("HTTP {}", status)),
                404 | 410 => CapabilityError::ContentRemoved(format!("HTTP {}", status)),
                _ => CapabilityError::Transient(format!("HTTP {}", status)),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CapabilityError::Transient(e.to_string()))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CapabilityError::Transient(e.to_string()))?;
        }
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| CapabilityError::Transient(e.to_string()))
    }

    async fn download_direct(
        &self,
        request: &DownloadRequest,
    ) -> Result<Vec<PathBuf>, CapabilityError> {
        let multiple = request.media_urls.len() > 1;
        let mut paths = Vec::with_capacity(request.media_urls.len());

        for (index, media_url) in request.media_urls.iter().enumerate() {
            let stem = if multiple {
                format!("{}-{}", request.file_stem, index + 1)
            } else {
                request.file_stem.clone()
            };
            let file_name = format!("{}.{}", stem, extension_from_url(media_url));
            let destination = request.destination_dir.join(file_name);

            self.fetch_to(media_url, &destination).await?;
            paths.push(destination);
        }

        Ok(paths)
    }
}

#[async_trait]
impl MetadataScraper for YtDlpClient {
    async fn scrape(&self, url: &str, platform: Platform) -> Result<PostMetadata, CapabilityError> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.cookies.args());
        args.push(url.to_string());

        let stdout = self.run(args).await?;
        let metadata = parse_dump_json(url, &stdout)?;

        log::debug!(
            "Scraped {} post {} (author: {:?})",
            platform,
            url,
            metadata.author
        );
        Ok(metadata)
    }
}

#[async_trait]
impl MediaDownloader for YtDlpClient {
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<PathBuf>, CapabilityError> {
        tokio::fs::create_dir_all(&request.destination_dir)
            .await
            .map_err(|e| CapabilityError::Transient(e.to_string()))?;

        let template = request
            .destination_dir
            .join(format!("{}.%(ext)s", request.file_stem));

        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        args.extend(self.cookies.args());
        args.push(request.url.clone());

        let primary = self.run(args).await.map(|stdout| {
            stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        });

        match primary {
            Ok(paths) if !paths.is_empty() => Ok(paths),
            Ok(_) if request.media_urls.is_empty() => Err(CapabilityError::Parse(
                "yt-dlp reported no downloaded files".to_string(),
            )),
            Err(e) if request.media_urls.is_empty() => Err(e),
            outcome => {
                if let Err(e) = &outcome {
                    log::debug!("yt-dlp download failed ({}), fetching media URLs directly", e);
                }
                self.download_direct(request).await
            }
        }
    }

    async fn download_thumbnail(&self, url: &str, destination: &Path) -> Result<(), CapabilityError> {
        self.fetch_to(url, destination).await
    }
}

/// Map a failed yt-dlp run to a typed error from its stderr.
pub fn classify_failure(stderr: &str) -> CapabilityError {
    let lowered = stderr.to_lowercase();
    let preview: String = stderr.trim().chars().take(STDERR_PREVIEW_CHARS).collect();

    if lowered.contains("login") || lowered.contains("private") {
        CapabilityError::PermissionDenied(format!("Private or login required: {}", preview))
    } else if lowered.contains("404")
        || lowered.contains("has been removed")
        || lowered.contains("no longer available")
    {
        CapabilityError::ContentRemoved(preview)
    } else if lowered.contains("unsupported url") {
        CapabilityError::Unsupported(preview)
    } else {
        CapabilityError::Transient(format!("yt-dlp failed: {}", preview))
    }
}

/// Parse `--dump-json` output: one JSON object per line, several for carousels.
pub fn parse_dump_json(url: &str, stdout: &str) -> Result<PostMetadata, CapabilityError> {
    let entries = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<YtDlpInfo>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CapabilityError::Parse(e.to_string()))?;

    let first = entries
        .first()
        .ok_or_else(|| CapabilityError::Parse("yt-dlp returned no metadata".to_string()))?;

    let media_urls: Vec<String> = entries.iter().filter_map(YtDlpInfo::best_media_url).collect();

    let media_type = if entries.len() > 1 {
        MediaType::Carousel
    } else if url.contains("/p/") && first.duration.is_none() {
        MediaType::Image
    } else {
        MediaType::Video
    };

    Ok(PostMetadata {
        author: non_blank(first.uploader.as_ref().or(first.channel.as_ref())),
        author_url: non_blank(first.uploader_url.as_ref().or(first.channel_url.as_ref())),
        title: non_blank(first.title.as_ref()),
        content: non_blank(first.description.as_ref()),
        posted_at: first
            .upload_date
            .as_deref()
            .and_then(parse_upload_date)
            .or_else(|| first.timestamp.and_then(|ts| DateTime::from_timestamp(ts as i64, 0))),
        views: first.view_count,
        likes: first.like_count,
        comments: first.comment_count,
        shares: first.repost_count,
        thumbnail_url: non_blank(first.thumbnail.as_ref()),
        media_urls,
        media_type: Some(media_type),
    })
}

fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extension_from_url(media_url: &str) -> String {
    url::Url::parse(media_url)
        .ok()
        .and_then(|parsed| {
            Path::new(parsed.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .map(str::to_lowercase)
        })
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_video_post() {
        let json = r#"{"uploader":"alice","uploader_url":"https://www.instagram.com/alice","title":"Video by alice","description":"hello world","upload_date":"20240115","view_count":1200,"like_count":80,"comment_count":5,"thumbnail":"https://cdn.example/t.jpg","duration":12.5,"formats":[{"url":"https://cdn.example/low.mp4","height":360},{"url":"https://cdn.example/high.mp4","height":1080}]}"#;

        let meta = parse_dump_json("https://www.instagram.com/reel/ABC", json).unwrap();

        assert_eq!(meta.author.as_deref(), Some("alice"));
        assert_eq!(meta.content.as_deref(), Some("hello world"));
        assert_eq!(meta.views, Some(1200));
        assert_eq!(meta.likes, Some(80));
        assert_eq!(meta.media_type, Some(MediaType::Video));
        assert_eq!(meta.media_urls, vec!["https://cdn.example/high.mp4".to_string()]);

        let posted = meta.posted_at.unwrap();
        assert_eq!((posted.year(), posted.month(), posted.day()), (2024, 1, 15));
    }

    #[test]
    fn test_parse_image_and_carousel() {
        let image = r#"{"channel":"bob","url":"https://cdn.example/a.jpg","timestamp":1700000000}"#;
        let meta = parse_dump_json("https://www.instagram.com/p/XYZ", image).unwrap();
        assert_eq!(meta.author.as_deref(), Some("bob"));
        assert_eq!(meta.media_type, Some(MediaType::Image));
        assert!(meta.posted_at.is_some());

        let carousel = format!("{}\n{}\n", image, r#"{"url":"https://cdn.example/b.jpg"}"#);
        let meta = parse_dump_json("https://www.instagram.com/p/XYZ", &carousel).unwrap();
        assert_eq!(meta.media_type, Some(MediaType::Carousel));
        assert_eq!(meta.media_urls.len(), 2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_dump_json("u", ""), Err(CapabilityError::Parse(_))));
        assert!(matches!(parse_dump_json("u", "not json"), Err(CapabilityError::Parse(_))));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("ERROR: This content is private. Login required"),
            CapabilityError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: HTTP Error 404: Not Found"),
            CapabilityError::ContentRemoved(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: Unable to download webpage: timed out"),
            CapabilityError::Transient(_)
        ));
    }

    #[test]
    fn test_cookie_args() {
        assert!(CookieSource::None.args().is_empty());
        assert_eq!(
            CookieSource::Browser("firefox".into()).args(),
            vec!["--cookies-from-browser", "firefox"]
        );
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://cdn.example/x/photo.JPG?sig=1"), "jpg");
        assert_eq!(extension_from_url("https://cdn.example/stream"), "bin");
    }
}

// src/integrations/mod.rs
//
// External Integrations Module
//
// Capability traits live in `capabilities`; everything else is an adapter.

pub mod capabilities;
pub mod file_manager;
pub mod http;
pub mod ytdlp;

pub use capabilities::{
    CapabilityError, DownloadRequest, FileManager, MediaDownloader, MetadataScraper, UrlValidator,
};
pub use file_manager::SystemFileManager;
pub use http::HttpValidator;
pub use ytdlp::{CookieSource, YtDlpClient};

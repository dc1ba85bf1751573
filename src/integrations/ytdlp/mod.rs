pub mod client;

pub use client::{CookieSource, YtDlpClient};

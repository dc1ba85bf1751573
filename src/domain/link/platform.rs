use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// Social platform inferred from the URL host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Facebook,
    Linkedin,
    Threads,
    Unknown,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::Linkedin,
        Platform::Threads,
        Platform::Unknown,
    ];

    /// Match a (lower-case) host against known signatures.
    /// Unmatched hosts are `Unknown`, never an error.
    pub fn from_host(host: &str) -> Self {
        let on = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if on("instagram.com") {
            Platform::Instagram
        } else if on("facebook.com") || on("fb.watch") {
            Platform::Facebook
        } else if on("linkedin.com") || on("lnkd.in") {
            Platform::Linkedin
        } else if on("threads.net") {
            Platform::Threads
        } else {
            Platform::Unknown
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Linkedin => "linkedin",
            Platform::Threads => "threads",
            Platform::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "linkedin" => Ok(Platform::Linkedin),
            "threads" => Ok(Platform::Threads),
            "unknown" => Ok(Platform::Unknown),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown platform '{}'",
                other
            ))),
        }
    }
}

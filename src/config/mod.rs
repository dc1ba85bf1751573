// src/config/mod.rs
//
// Process-wide configuration, persisted as JSON next to the database.
//
// CRITICAL RULES:
// - Read once at startup; every change goes through ConfigStore::update
// - A changed source_dir must exist before it is accepted
// - Credential (auth) changes only apply after a restart; update() says so

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::integrations::CookieSource;

/// How network adapters authenticate against login-walled platforms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthConfig {
    BrowserCookies { browser: String },
    CookieFile { path: PathBuf },
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::BrowserCookies {
            browser: "chrome".to_string(),
        }
    }
}

impl From<&AuthConfig> for CookieSource {
    fn from(auth: &AuthConfig) -> Self {
        match auth {
            AuthConfig::BrowserCookies { browser } if browser.trim().is_empty() => CookieSource::None,
            AuthConfig::BrowserCookies { browser } => CookieSource::Browser(browser.trim().to_string()),
            AuthConfig::CookieFile { path } => CookieSource::File(path.clone()),
        }
    }
}

/// Background task tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Upper bound for one network-bound step on one record
    pub target_timeout_secs: u64,
    pub worker_count: usize,
    /// Pause between targets handled by the same worker
    pub request_delay_ms: u64,
    /// Size of the recent-completions buffer
    pub recent_capacity: usize,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            target_timeout_secs: 30,
            worker_count: 2,
            request_delay_ms: 500,
            recent_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_dir: Option<PathBuf>,
    pub file_pattern: String,
    pub recursive: bool,
    pub auth: AuthConfig,
    pub tasks: TaskSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            file_pattern: "*.md".to_string(),
            recursive: true,
            auth: AuthConfig::default(),
            tasks: TaskSettings::default(),
        }
    }
}

/// Partial change; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub source_dir: Option<PathBuf>,
    pub file_pattern: Option<String>,
    pub recursive: Option<bool>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigUpdateOutcome {
    pub config: AppConfig,
    pub restart_required: bool,
}

pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<AppConfig>,
}

impl ConfigStore {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                AppError::Config(format!("Cannot parse {}: {}", path.display(), e))
            })?
        } else {
            log::info!("No config at {}, using defaults", path.display());
            AppConfig::default()
        };

        Ok(Self {
            path,
            current: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> AppConfig {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn update(&self, change: ConfigUpdate) -> AppResult<ConfigUpdateOutcome> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut next = current.clone();

        if let Some(dir) = change.source_dir {
            if !dir.is_dir() {
                return Err(AppError::Config(format!(
                    "source_dir does not exist or is not a directory: {}",
                    dir.display()
                )));
            }
            next.source_dir = Some(dir);
        }

        if let Some(pattern) = change.file_pattern {
            glob::Pattern::new(&pattern)
                .map_err(|e| AppError::Config(format!("Invalid file_pattern '{}': {}", pattern, e)))?;
            next.file_pattern = pattern;
        }

        if let Some(recursive) = change.recursive {
            next.recursive = recursive;
        }

        if let Some(auth) = change.auth {
            if let AuthConfig::CookieFile { path } = &auth {
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "cookie file not found: {}",
                        path.display()
                    )));
                }
            }
            next.auth = auth;
        }

        let restart_required = next.auth != current.auth;
        self.persist(&next)?;
        *current = next.clone();

        if restart_required {
            log::warn!("Authentication settings changed; restart to apply");
        }
        log::info!("Configuration saved to {}", self.path.display());

        Ok(ConfigUpdateOutcome {
            config: next,
            restart_required,
        })
    }

    fn persist(&self, config: &AppConfig) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join("config.json")).unwrap()
    }

    #[test]
    fn test_defaults_when_absent() {
        let dir = TempDir::new().unwrap();
        let config = store_in(&dir).get();

        assert_eq!(config.file_pattern, "*.md");
        assert!(config.recursive);
        assert_eq!(config.tasks.target_timeout_secs, 30);
        assert_eq!(config.tasks.recent_capacity, 10);
        assert!(config.source_dir.is_none());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes");
        std::fs::create_dir(&notes).unwrap();

        let store = store_in(&dir);
        let outcome = store
            .update(ConfigUpdate {
                source_dir: Some(notes.clone()),
                recursive: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(!outcome.restart_required);

        let reloaded = store_in(&dir).get();
        assert_eq!(reloaded.source_dir, Some(notes));
        assert!(!reloaded.recursive);
    }

    #[test]
    fn test_missing_source_dir_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let result = store.update(ConfigUpdate {
            source_dir: Some(dir.path().join("nope")),
            ..Default::default()
        });

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(store.get().source_dir.is_none());
    }

    #[test]
    fn test_auth_change_requires_restart() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let outcome = store
            .update(ConfigUpdate {
                auth: Some(AuthConfig::BrowserCookies {
                    browser: "firefox".to_string(),
                }),
                ..Default::default()
            })
            .unwrap();
        assert!(outcome.restart_required);

        let same = store
            .update(ConfigUpdate {
                auth: Some(AuthConfig::BrowserCookies {
                    browser: "firefox".to_string(),
                }),
                ..Default::default()
            })
            .unwrap();
        assert!(!same.restart_required);
    }

    #[test]
    fn test_auth_serialization_shape() {
        let auth = AuthConfig::CookieFile {
            path: PathBuf::from("/tmp/cookies.txt"),
        };
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["mode"], "cookie_file");
        assert_eq!(CookieSource::from(&auth), CookieSource::File(PathBuf::from("/tmp/cookies.txt")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let dir = TempDir::new().unwrap();
        let result = store_in(&dir).update(ConfigUpdate {
            file_pattern: Some("[".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}

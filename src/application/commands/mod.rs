// src/application/commands/mod.rs
//
// Command Handlers
//
// ARCHITECTURE:
// - Commands are thin adapters between callers (CLI, viewer) and services
// - Commands accept DTOs, return DTOs
// - Commands convert every error into an ErrorResponse
// - Commands NEVER contain business logic

pub mod config_commands;
pub mod post_commands;
pub mod scan_commands;
pub mod statistics_commands;
pub mod task_commands;

pub use config_commands::*;
pub use post_commands::*;
pub use scan_commands::*;
pub use statistics_commands::*;
pub use task_commands::*;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::application::dto::{ListPostsDto, UpdateConfigDto};
    use crate::application::error_handling::ErrorType;
    use crate::application::state::{AppState, Capabilities};
    use crate::config::ConfigStore;
    use crate::domain::ValidationReport;
    use crate::integrations::capabilities::{
        MockFileManager, MockMediaDownloader, MockMetadataScraper, MockUrlValidator,
    };
    use crate::store::StoreLayout;

    fn state(dir: &TempDir, file_manager: MockFileManager) -> AppState {
        let layout = StoreLayout::new(dir.path().join("data"));
        let config = ConfigStore::load(layout.config_path()).unwrap();

        let mut validator = MockUrlValidator::new();
        validator
            .expect_validate()
            .returning(|_| Ok(ValidationReport::accessible(Some(200))));

        AppState::with_capabilities(
            layout,
            config,
            Capabilities {
                validator: Arc::new(validator),
                scraper: Arc::new(MockMetadataScraper::new()),
                downloader: Arc::new(MockMediaDownloader::new()),
                file_manager: Arc::new(file_manager),
            },
        )
        .unwrap()
    }

    fn write_notes(dir: &TempDir) -> String {
        let notes = dir.path().join("notes");
        std::fs::create_dir_all(&notes).unwrap();
        std::fs::write(
            notes.join("a.md"),
            "See https://instagram.com/p/ABC123?utm_source=ig\nand https://threads.net/@bob/post/XYZ\n",
        )
        .unwrap();
        notes.to_string_lossy().into_owned()
    }

    #[test]
    fn test_scan_needs_a_source_dir() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());

        let error = scan_source(&state, None).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
    }

    #[test]
    fn test_scan_uses_configured_source_dir() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());
        let notes = write_notes(&dir);

        update_config(
            &state,
            UpdateConfigDto {
                source_dir: Some(notes),
                ..Default::default()
            },
        )
        .unwrap();

        let result = scan_source(&state, None).unwrap();
        assert_eq!(result.new_urls, 2);

        let page = list_posts(&state, ListPostsDto::default()).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_config_rejects_missing_source_dir() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());

        let error = update_config(
            &state,
            UpdateConfigDto {
                source_dir: Some(dir.path().join("nope").to_string_lossy().into_owned()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert!(get_config(&state).source_dir.is_none());
    }

    #[test]
    fn test_auth_change_requires_restart() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());

        let dto = update_config(
            &state,
            UpdateConfigDto {
                browser: Some("firefox".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(dto.restart_required);
        assert_eq!(dto.browser.as_deref(), Some("firefox"));
        assert_eq!(get_config(&state).browser.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_bad_ids_are_validation_errors() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());

        assert_eq!(
            get_post(&state, "not an id".into()).unwrap_err().error_type,
            ErrorType::Validation
        );
        assert_eq!(
            delete_posts(&state, vec![]).unwrap_err().error_type,
            ErrorType::Validation
        );
    }

    #[test]
    fn test_malformed_id_does_not_block_batch_delete() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());
        let notes = write_notes(&dir);
        let result = scan_source(&state, Some(notes)).unwrap();
        let good = result.urls[0].id.to_string();

        let report = delete_posts(&state, vec!["bogus".into(), good.clone()]).unwrap();

        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].id, "bogus");
        assert_eq!(
            get_post(&state, good).unwrap_err().error_type,
            ErrorType::NotFound
        );
        assert_eq!(list_posts(&state, ListPostsDto::default()).unwrap().total, 1);
    }

    #[test]
    fn test_open_without_media_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());
        let notes = write_notes(&dir);
        let result = scan_source(&state, Some(notes)).unwrap();

        let error = open_post_media(&state, result.urls[0].id.to_string()).unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_scan_is_refused_while_a_task_runs() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, MockFileManager::new());
        let notes = write_notes(&dir);
        scan_source(&state, Some(notes.clone())).unwrap();

        let accepted = start_validate(&state, None).unwrap();
        assert_eq!(accepted.task, "validate");
        assert_eq!(accepted.count, 2);

        let error = scan_source(&state, Some(notes)).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Conflict);

        let status = state
            .orchestrator
            .wait_until_idle(Duration::from_millis(20))
            .await;
        assert!(!status.is_running);
        assert_eq!(task_status(&state).state, "completed");

        let page = list_posts(
            &state,
            ListPostsDto {
                status: vec!["accessible".into()],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.total, 2);
    }
}

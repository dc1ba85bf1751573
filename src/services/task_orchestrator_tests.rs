// src/services/task_orchestrator_tests.rs
//
// Task Orchestrator + per-record lifecycle
//
// INVARIANTS TESTED:
// - Only one task at a time; a second start is rejected, a later one succeeds
// - A held scan/reindex slot rejects task starts until it is released
// - One record's failure never stops its siblings
// - Transient failures land in `error`, never in `private`/`deleted`
// - Terminal records are only re-checked on explicit request
// - Slow capabilities are cut off by the per-target timeout

#[cfg(test)]
mod orchestrator_tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{
        MediaType, PostMetadata, PostStatus, Reachability, TaskKind, TaskPhase, ValidationReport,
    };
    use crate::error::AppError;
    use crate::integrations::capabilities::{
        MockMediaDownloader, MockMetadataScraper, MockUrlValidator,
    };
    use crate::integrations::{CapabilityError, UrlValidator};
    use crate::services::test_support::Harness;

    const POLL: Duration = Duration::from_millis(10);
    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Validator that takes a while, so a task stays running
    struct SlowValidator {
        delay: Duration,
    }

    #[async_trait]
    impl UrlValidator for SlowValidator {
        async fn validate(&self, _url: &str) -> Result<ValidationReport, CapabilityError> {
            tokio::time::sleep(self.delay).await;
            Ok(ValidationReport::accessible(Some(200)))
        }
    }

    fn validator_returning(report: ValidationReport) -> MockUrlValidator {
        let mut validator = MockUrlValidator::new();
        validator
            .expect_validate()
            .returning(move |_| Ok(report.clone()));
        validator
    }

    fn accessible_validator() -> MockUrlValidator {
        validator_returning(ValidationReport::accessible(Some(200)))
    }

    fn scraper_returning(metadata: PostMetadata) -> MockMetadataScraper {
        let mut scraper = MockMetadataScraper::new();
        scraper
            .expect_scrape()
            .returning(move |_, _| Ok(metadata.clone()));
        scraper
    }

    #[tokio::test]
    async fn test_private_classification_scenario() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/PRIV");

        let lifecycle = h.lifecycle(
            validator_returning(ValidationReport::classified(Reachability::Private, "Login required")),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        );
        let orchestrator = h.orchestrator(lifecycle);

        assert_eq!(orchestrator.start(TaskKind::Validate, None).unwrap(), 1);
        let status = orchestrator.wait_until_idle(POLL).await;

        assert!(matches!(status.phase, TaskPhase::Completed { .. }));
        assert_eq!(status.progress, 1);
        assert_eq!(status.succeeded, 1);

        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Private);
        assert!(post.error_message.is_none());
        assert!(post.author.is_none());
        assert!(post.likes.is_none());
        assert!(post.validated_at.is_some());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_until_idle() {
        let h = Harness::new();
        h.stub("https://instagram.com/p/SLOW1");
        h.stub("https://instagram.com/p/SLOW2");

        let lifecycle = h.lifecycle(
            SlowValidator {
                delay: Duration::from_millis(150),
            },
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        );
        let orchestrator = h.orchestrator(lifecycle);

        assert_eq!(orchestrator.start(TaskKind::Validate, None).unwrap(), 2);
        assert!(orchestrator.poll().is_running);

        let rejected = orchestrator.start(TaskKind::Scrape, None);
        assert!(matches!(
            rejected,
            Err(AppError::TaskAlreadyRunning {
                running: TaskKind::Validate
            })
        ));
        assert!(matches!(
            orchestrator.begin_exclusive("scan"),
            Err(AppError::TaskAlreadyRunning { .. })
        ));

        let done = orchestrator.wait_until_idle(POLL).await;
        assert!(!done.is_running);
        assert_eq!(done.succeeded, 2);
        assert!(done.finished_at.is_some());

        drop(orchestrator.begin_exclusive("scan").unwrap());
        assert_eq!(orchestrator.start(TaskKind::Validate, None).unwrap(), 0);
        orchestrator.wait_until_idle(POLL).await;
    }

    #[tokio::test]
    async fn test_held_scan_slot_rejects_task_start() {
        let h = Harness::new();
        h.stub("https://instagram.com/p/HELD1");

        let lifecycle = h.lifecycle(
            accessible_validator(),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        );
        let orchestrator = h.orchestrator(lifecycle);

        let guard = orchestrator.begin_exclusive("scan").unwrap();
        assert!(matches!(
            orchestrator.start(TaskKind::Validate, None),
            Err(AppError::OperationInProgress { operation: "scan" })
        ));
        assert!(matches!(
            orchestrator.begin_exclusive("reindex"),
            Err(AppError::OperationInProgress { operation: "scan" })
        ));
        assert!(!orchestrator.poll().is_running);

        drop(guard);
        assert_eq!(orchestrator.start(TaskKind::Validate, None).unwrap(), 1);
        let done = orchestrator.wait_until_idle(POLL).await;
        assert_eq!(done.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let h = Harness::new();
        let good = h.stub("https://instagram.com/p/GOOD");
        let bad = h.stub("https://instagram.com/p/BAD");

        let mut validator = MockUrlValidator::new();
        validator.expect_validate().returning(|url| {
            if url.contains("BAD") {
                Err(CapabilityError::Transient("connection reset".to_string()))
            } else {
                Ok(ValidationReport::accessible(Some(200)))
            }
        });
        let lifecycle = h.lifecycle(validator, MockMetadataScraper::new(), MockMediaDownloader::new(), TIMEOUT);
        let orchestrator = h.orchestrator(lifecycle);

        orchestrator.start(TaskKind::Validate, None).unwrap();
        let status = orchestrator.wait_until_idle(POLL).await;

        assert_eq!(status.succeeded, 1);
        assert_eq!(status.failed, 1);
        assert_eq!(status.errors.len(), 1);
        assert!(status.message.contains("1 failed"));

        assert_eq!(h.store.require(&good).unwrap().status, PostStatus::Accessible);
        let bad = h.store.require(&bad).unwrap();
        assert_eq!(bad.status, PostStatus::Error);
        assert!(bad.error_message.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_terminal_records_need_explicit_revalidation() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/GONE");

        let first = h.orchestrator(h.lifecycle(
            validator_returning(ValidationReport::classified(Reachability::Deleted, "Not found")),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        first.start(TaskKind::Validate, None).unwrap();
        first.wait_until_idle(POLL).await;
        assert_eq!(h.store.require(&id).unwrap().status, PostStatus::Deleted);

        let second = h.orchestrator(h.lifecycle(
            accessible_validator(),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        assert_eq!(second.start(TaskKind::Validate, None).unwrap(), 0);
        second.wait_until_idle(POLL).await;
        assert_eq!(h.store.require(&id).unwrap().status, PostStatus::Deleted);

        assert_eq!(second.start(TaskKind::Validate, Some(vec![id.clone(), id.clone()])).unwrap(), 1);
        second.wait_until_idle(POLL).await;
        assert_eq!(h.store.require(&id).unwrap().status, PostStatus::Accessible);
    }

    #[tokio::test]
    async fn test_slow_target_times_out_into_error() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/HANG");

        let lifecycle = h.lifecycle(
            SlowValidator {
                delay: Duration::from_secs(10),
            },
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            Duration::from_millis(50),
        );
        let orchestrator = h.orchestrator(lifecycle);

        orchestrator.start(TaskKind::Validate, None).unwrap();
        let status = orchestrator.wait_until_idle(POLL).await;

        assert_eq!(status.failed, 1);
        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Error);
        assert!(post.error_message.unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_validate_scrape_download_pipeline() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/FULL");

        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_download_thumbnail()
            .returning(|_, _| Ok(()));
        downloader
            .expect_download()
            .returning(|request| {
                Ok(vec![request.destination_dir.join(format!("{}.mp4", request.file_stem))])
            });

        let lifecycle = h.lifecycle(
            accessible_validator(),
            scraper_returning(PostMetadata {
                author: Some("alice".to_string()),
                title: Some("Reel".to_string()),
                likes: Some(42),
                thumbnail_url: Some("https://cdn.example/t.jpg".to_string()),
                media_type: Some(MediaType::Video),
                ..Default::default()
            }),
            downloader,
            TIMEOUT,
        );
        let orchestrator = h.orchestrator(lifecycle);

        for kind in [TaskKind::Validate, TaskKind::Scrape, TaskKind::Download] {
            assert_eq!(orchestrator.start(kind, None).unwrap(), 1, "{}", kind);
            let status = orchestrator.wait_until_idle(POLL).await;
            assert_eq!(status.succeeded, 1, "{}", kind);
        }

        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Accessible);
        assert_eq!(post.author.as_deref(), Some("alice"));
        assert_eq!(post.likes, Some(42));
        assert!(post.thumbnail_path.unwrap().ends_with(&format!("{}.jpg", id)));
        assert!(post.downloaded_at.is_some());

        let expected: PathBuf = h
            .store
            .layout()
            .author_media_dir(Some("alice"))
            .join(format!("Reel-{}.mp4", id));
        assert_eq!(post.media_paths, vec![expected.to_string_lossy().into_owned()]);

        let recent = orchestrator.take_recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].likes, Some(42));
        assert!(orchestrator.poll().recent.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_failure_is_recoverable() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/FLAKY");

        let validate = h.orchestrator(h.lifecycle(
            accessible_validator(),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        validate.start(TaskKind::Validate, None).unwrap();
        validate.wait_until_idle(POLL).await;

        let mut failing = MockMetadataScraper::new();
        failing
            .expect_scrape()
            .returning(|_, _| Err(CapabilityError::Transient("yt-dlp failed: 500".to_string())));
        let broken = h.orchestrator(h.lifecycle(
            accessible_validator(),
            failing,
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        broken.start(TaskKind::Scrape, None).unwrap();
        broken.wait_until_idle(POLL).await;

        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Error);
        assert!(!post.is_scraped());

        let fixed = h.orchestrator(h.lifecycle(
            accessible_validator(),
            scraper_returning(PostMetadata {
                author: Some("bob".to_string()),
                ..Default::default()
            }),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        fixed.start(TaskKind::Scrape, Some(vec![id.clone()])).unwrap();
        let status = fixed.wait_until_idle(POLL).await;

        assert_eq!(status.succeeded, 1);
        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Accessible);
        assert!(post.error_message.is_none());
        assert_eq!(post.author.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_failed_validation_is_not_bypassed_by_scrape() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/DOWN");

        let mut offline = MockUrlValidator::new();
        offline
            .expect_validate()
            .returning(|_| Err(CapabilityError::Transient("network down".to_string())));
        let validate = h.orchestrator(h.lifecycle(
            offline,
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        validate.start(TaskKind::Validate, None).unwrap();
        validate.wait_until_idle(POLL).await;
        assert_eq!(h.store.require(&id).unwrap().status, PostStatus::Error);

        let scrape = h.orchestrator(h.lifecycle(
            accessible_validator(),
            scraper_returning(PostMetadata {
                author: Some("x".to_string()),
                ..Default::default()
            }),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        scrape.start(TaskKind::Scrape, Some(vec![id.clone()])).unwrap();
        let status = scrape.wait_until_idle(POLL).await;

        assert_eq!(status.skipped, 1);
        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Error);
        assert!(post.author.is_none());
        assert!(!post.is_scraped());

        scrape.start(TaskKind::Validate, Some(vec![id.clone()])).unwrap();
        scrape.wait_until_idle(POLL).await;
        scrape.start(TaskKind::Scrape, Some(vec![id.clone()])).unwrap();
        let status = scrape.wait_until_idle(POLL).await;

        assert_eq!(status.succeeded, 1);
        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Accessible);
        assert_eq!(post.author.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_pending_records_are_never_scraped() {
        let h = Harness::new();
        let id = h.stub("https://instagram.com/p/RAW");

        let orchestrator = h.orchestrator(h.lifecycle(
            accessible_validator(),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));

        orchestrator.start(TaskKind::Scrape, Some(vec![id.clone()])).unwrap();
        let status = orchestrator.wait_until_idle(POLL).await;

        assert_eq!(status.skipped, 1);
        let post = h.store.require(&id).unwrap();
        assert_eq!(post.status, PostStatus::Pending);
        assert!(!post.has_metadata());
    }

    #[tokio::test]
    async fn test_recent_buffer_keeps_newest() {
        let h = Harness::new();
        for n in 0..5 {
            h.stub(&format!("https://instagram.com/p/R{}", n));
        }

        let orchestrator = h.orchestrator(h.lifecycle(
            accessible_validator(),
            MockMetadataScraper::new(),
            MockMediaDownloader::new(),
            TIMEOUT,
        ));
        orchestrator.start(TaskKind::Validate, None).unwrap();
        let status = orchestrator.wait_until_idle(POLL).await;

        assert_eq!(status.progress, 5);
        assert_eq!(status.recent.len(), 3);
    }
}

// src/services/scan_service.rs
//
// Scan/Dedup Engine
//
// CRITICAL RULES:
// - Purely additive: existing records are never mutated or deleted
// - One stub per distinct normalized URL, first document wins
// - Unreadable documents become warnings, never abort the scan
// - A missing source directory aborts the whole scan

use glob::Pattern;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::domain::scan::DUPLICATE_LIST_LIMIT;
use crate::domain::{
    normalize, DuplicateGroup, LinkExtractor, NormalizedUrl, PostRecord, ScanResult,
    ScanWarning, ScannedUrl, UrlState,
};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, PostDiscovered, ScanCompleted};
use crate::store::PostStore;

/// Where and what to scan
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub source_dir: PathBuf,
    pub file_pattern: String,
    pub recursive: bool,
}

impl ScanRequest {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            file_pattern: "*.md".to_string(),
            recursive: true,
        }
    }
}

/// First sighting of a normalized URL within one scan
struct Sighting {
    raw_url: String,
    normalized: NormalizedUrl,
    source_file: String,
    line: usize,
    context: Option<String>,
    occurrences: usize,
    files: BTreeSet<String>,
}

pub struct ScanService {
    store: Arc<PostStore>,
    event_bus: Arc<EventBus>,
    extractor: LinkExtractor,
}

impl ScanService {
    pub fn new(store: Arc<PostStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            store,
            event_bus,
            extractor: LinkExtractor::new(),
        }
    }

    pub fn scan(&self, request: &ScanRequest) -> AppResult<ScanResult> {
        let source_dir = &request.source_dir;
        if !source_dir.is_dir() {
            return Err(AppError::SourceUnavailable {
                path: source_dir.clone(),
                reason: "not a readable directory".to_string(),
            });
        }

        let pattern = Pattern::new(&request.file_pattern).map_err(|e| {
            AppError::Config(format!("Invalid file pattern '{}': {}", request.file_pattern, e))
        })?;

        let mut result = ScanResult::new(source_dir.to_string_lossy());
        let mut order: Vec<String> = Vec::new();
        let mut sightings: HashMap<String, Sighting> = HashMap::new();

        let max_depth = if request.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(source_dir)
            .max_depth(max_depth)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    log::warn!("Skipping unreadable entry {}: {}", path, e);
                    result.warnings.push(ScanWarning {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() || !pattern.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let display = relative_display(source_dir, entry.path());
            let text = match std::fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping unreadable document {}: {}", display, e);
                    result.warnings.push(ScanWarning {
                        path: display,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            result.files_scanned += 1;

            for link in self.extractor.extract(&text) {
                result.total_urls += 1;
                let normalized = normalize(&link.url);

                match sightings.get_mut(&normalized.value) {
                    Some(seen) => {
                        seen.occurrences += 1;
                        seen.files.insert(display.clone());
                    }
                    None => {
                        order.push(normalized.value.clone());
                        sightings.insert(
                            normalized.value.clone(),
                            Sighting {
                                raw_url: link.url,
                                normalized,
                                source_file: display.clone(),
                                line: link.line,
                                context: link.context,
                                occurrences: 1,
                                files: BTreeSet::from([display.clone()]),
                            },
                        );
                    }
                }
            }
        }

        result.unique_urls = order.len();
        result.duplicates = result.total_urls - result.unique_urls;

        for key in &order {
            let Some(seen) = sightings.remove(key) else {
                continue;
            };
            self.record_sighting(&mut result, seen);
        }

        self.event_bus.emit(ScanCompleted::new(
            result.source_dir.clone(),
            result.files_scanned,
            result.unique_urls,
            result.new_urls,
        ));

        log::info!(
            "Scanned {} documents in {}: {} urls, {} unique, {} new, {} duplicates, {} warnings",
            result.files_scanned,
            result.source_dir,
            result.total_urls,
            result.unique_urls,
            result.new_urls,
            result.duplicates,
            result.warnings.len()
        );

        Ok(result)
    }

    fn record_sighting(&self, result: &mut ScanResult, seen: Sighting) {
        if seen.occurrences > 1 && result.duplicate_list.len() < DUPLICATE_LIST_LIMIT {
            result.duplicate_list.push(DuplicateGroup {
                normalized_url: seen.normalized.value.clone(),
                occurrences: seen.occurrences,
                files: seen.files.iter().cloned().collect(),
            });
        }

        let stub = PostRecord::stub(
            seen.raw_url.clone(),
            &seen.normalized,
            seen.source_file.clone(),
            seen.context.clone(),
        );

        let state = match self.store.insert_if_absent(&stub) {
            Ok(true) => {
                self.event_bus.emit(PostDiscovered::new(
                    stub.id.clone(),
                    stub.platform,
                    stub.source_file.clone(),
                ));
                result.new_urls += 1;
                UrlState::New
            }
            Ok(false) => {
                result.existing_urls += 1;
                UrlState::Existing
            }
            Err(e) => {
                log::error!("Failed to store stub for {}: {}", seen.normalized, e);
                result.warnings.push(ScanWarning {
                    path: seen.source_file.clone(),
                    message: format!("{}: {}", seen.normalized, e),
                });
                return;
            }
        };

        *result.by_platform.entry(stub.platform).or_insert(0) += 1;
        result.urls.push(ScannedUrl {
            id: stub.id,
            url: seen.raw_url,
            normalized_url: seen.normalized.value,
            platform: stub.platform,
            source_file: seen.source_file,
            line: seen.line,
            state,
        });
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

// src/application/commands/scan_commands.rs
//
// Scan Command Handlers
//
// RULES:
// - A scan holds the task slot for its whole run; no task starts meanwhile
// - The source directory comes from the request or else from config

use std::path::PathBuf;

use crate::application::error_handling::{CommandResult, ErrorResponse};
use crate::application::state::AppState;
use crate::domain::ScanResult;
use crate::services::ScanRequest;

/// Scan `source_dir` (or the configured one) and merge new URLs into the store
pub fn scan_source(state: &AppState, source_dir: Option<String>) -> CommandResult<ScanResult> {
    let _slot = state.orchestrator.begin_exclusive("scan")?;

    let config = state.config.get();
    let source_dir = match source_dir.map(PathBuf::from).or(config.source_dir) {
        Some(dir) => dir,
        None => {
            return Err(ErrorResponse::validation(
                "No source directory given and none configured",
            ))
        }
    };

    let request = ScanRequest {
        source_dir,
        file_pattern: config.file_pattern,
        recursive: config.recursive,
    };

    Ok(state.scan_service.scan(&request)?)
}

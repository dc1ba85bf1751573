// src/application/commands/task_commands.rs
//
// Background Task Command Handlers
//
// RULES:
// - Starting returns immediately with the accepted target count
// - Completion is observed by polling task_status until is_running is false
// - Must be called from inside the tokio runtime

use crate::application::dto::{parse_post_ids, RecentRecordDto, TaskAcceptedDto, TaskStatusDto};
use crate::application::error_handling::{CommandResult, ErrorResponse};
use crate::application::state::AppState;
use crate::domain::TaskKind;

fn start_task(
    state: &AppState,
    kind: TaskKind,
    post_ids: Option<Vec<String>>,
) -> CommandResult<TaskAcceptedDto> {
    let targets = match post_ids {
        Some(raw) if !raw.is_empty() => {
            Some(parse_post_ids(&raw).map_err(ErrorResponse::validation)?)
        }
        _ => None,
    };

    let count = state.orchestrator.start(kind, targets)?;
    Ok(TaskAcceptedDto {
        task: kind.to_string(),
        count,
    })
}

/// Validate the given posts (manual re-validation) or every pending/error post
pub fn start_validate(
    state: &AppState,
    post_ids: Option<Vec<String>>,
) -> CommandResult<TaskAcceptedDto> {
    start_task(state, TaskKind::Validate, post_ids)
}

/// Scrape metadata for the given posts or every accessible post not yet scraped
pub fn start_scrape(
    state: &AppState,
    post_ids: Option<Vec<String>>,
) -> CommandResult<TaskAcceptedDto> {
    start_task(state, TaskKind::Scrape, post_ids)
}

/// Download media for the given posts or every scraped post without media
pub fn start_download(
    state: &AppState,
    post_ids: Option<Vec<String>>,
) -> CommandResult<TaskAcceptedDto> {
    start_task(state, TaskKind::Download, post_ids)
}

pub fn task_status(state: &AppState) -> TaskStatusDto {
    TaskStatusDto::from(state.orchestrator.poll())
}

/// Drain the recent-completions buffer
pub fn take_recent(state: &AppState) -> Vec<RecentRecordDto> {
    state
        .orchestrator
        .take_recent()
        .into_iter()
        .map(RecentRecordDto::from)
        .collect()
}

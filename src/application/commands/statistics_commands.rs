// src/application/commands/statistics_commands.rs

use crate::application::error_handling::CommandResult;
use crate::application::state::AppState;
use crate::domain::{ArchiveStatistics, FilterVocabulary};

/// Recompute archive statistics and store a fresh snapshot
pub fn get_statistics(state: &AppState) -> CommandResult<ArchiveStatistics> {
    Ok(state.statistics_service.refresh_snapshot()?)
}

/// Values a filter UI can offer
pub fn get_filter_vocabulary(state: &AppState) -> CommandResult<FilterVocabulary> {
    Ok(state.statistics_service.vocabulary()?)
}

/// Rebuild the derived index from the per-post records
pub fn reindex(state: &AppState) -> CommandResult<usize> {
    let _slot = state.orchestrator.begin_exclusive("reindex")?;
    let count = state.store.reindex()?;
    state.statistics_service.refresh_snapshot()?;
    Ok(count)
}

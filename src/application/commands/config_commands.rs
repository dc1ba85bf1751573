// src/application/commands/config_commands.rs
//
// Config Command Handlers
//
// Credential changes are persisted immediately but the running adapters keep
// the credentials they were built with; the response says when a restart is due.

use std::path::PathBuf;

use crate::application::dto::{ConfigDto, UpdateConfigDto};
use crate::application::error_handling::{CommandResult, ErrorResponse};
use crate::application::state::AppState;
use crate::config::ConfigUpdate;

pub fn get_config(state: &AppState) -> ConfigDto {
    ConfigDto::from_config(&state.config.get(), false)
}

pub fn update_config(state: &AppState, dto: UpdateConfigDto) -> CommandResult<ConfigDto> {
    let current = state.config.get();
    let auth = dto.auth(&current.auth).map_err(ErrorResponse::validation)?;

    let outcome = state.config.update(ConfigUpdate {
        source_dir: dto.source_dir.map(PathBuf::from),
        file_pattern: dto.file_pattern,
        recursive: dto.recursive,
        auth,
    })?;

    if outcome.restart_required {
        log::warn!("Authentication settings changed; restart to apply them");
    }
    Ok(ConfigDto::from_config(&outcome.config, outcome.restart_required))
}

// src/application/commands/post_commands.rs
//
// Post Command Handlers
//
// RULES:
// - Accept DTOs / raw ids
// - Call services
// - Return DTOs
// - Never contain business logic

use std::path::Path;

use crate::application::dto::{DeleteErrorDto, DeleteResultDto, ListPostsDto, PostDto, PostPageDto};
use crate::application::error_handling::{CommandResult, ErrorResponse};
use crate::application::state::AppState;
use crate::domain::PostId;
use crate::error::AppError;

fn parse_id(raw: &str) -> CommandResult<PostId> {
    PostId::parse(raw.trim()).map_err(|e| ErrorResponse::validation(e.to_string()))
}

/// Filtered, sorted, paginated listing
pub fn list_posts(state: &AppState, dto: ListPostsDto) -> CommandResult<PostPageDto> {
    let query = dto.into_query().map_err(ErrorResponse::validation)?;
    let page = state.post_service.list(&query)?;
    Ok(PostPageDto::from(page))
}

pub fn get_post(state: &AppState, post_id: String) -> CommandResult<PostDto> {
    let id = parse_id(&post_id)?;
    Ok(PostDto::from(state.post_service.get(&id)?))
}

/// Private and deleted posts
pub fn list_inaccessible(state: &AppState) -> CommandResult<Vec<PostDto>> {
    let posts = state.post_service.list_inaccessible()?;
    Ok(posts.into_iter().map(PostDto::from).collect())
}

/// Replace the whole tag set
pub fn set_tags(state: &AppState, post_id: String, tags: Vec<String>) -> CommandResult<PostDto> {
    let id = parse_id(&post_id)?;
    Ok(PostDto::from(state.post_service.set_tags(&id, tags)?))
}

pub fn add_tag(state: &AppState, post_id: String, tag: String) -> CommandResult<PostDto> {
    let id = parse_id(&post_id)?;
    let (post, added) = state.post_service.add_tag(&id, &tag)?;
    if !added {
        log::debug!("Tag '{}' already present on {}", tag.trim(), id);
    }
    Ok(PostDto::from(post))
}

pub fn remove_tag(state: &AppState, post_id: String, tag: String) -> CommandResult<PostDto> {
    let id = parse_id(&post_id)?;
    let (post, _) = state.post_service.remove_tag(&id, &tag)?;
    Ok(PostDto::from(post))
}

/// Set or clear (None / blank) the free-text note
pub fn set_note(state: &AppState, post_id: String, note: Option<String>) -> CommandResult<PostDto> {
    let id = parse_id(&post_id)?;
    Ok(PostDto::from(state.post_service.set_note(&id, note)?))
}

/// Delete records with their media; failures are reported per id
pub fn delete_posts(state: &AppState, post_ids: Vec<String>) -> CommandResult<DeleteResultDto> {
    if post_ids.is_empty() {
        return Err(ErrorResponse::validation("No post ids given"));
    }

    // A malformed id is a per-id error like an unknown one; the rest still run.
    let mut ids = Vec::with_capacity(post_ids.len());
    let mut malformed = Vec::new();
    for raw in &post_ids {
        match PostId::parse(raw.trim()) {
            Ok(id) => ids.push(id),
            Err(e) => malformed.push(DeleteErrorDto {
                id: raw.trim().to_string(),
                message: e.to_string(),
            }),
        }
    }

    let mut result = DeleteResultDto::from(state.post_service.delete(&ids)?);
    result.errors.splice(0..0, malformed);
    Ok(result)
}

/// Reveal the post's first media file (or its thumbnail) in the OS file manager
pub fn open_post_media(state: &AppState, post_id: String) -> CommandResult<()> {
    let id = parse_id(&post_id)?;
    let post = state.post_service.get(&id)?;

    let target = post
        .media_paths
        .first()
        .or(post.thumbnail_path.as_ref())
        .ok_or_else(|| ErrorResponse::not_found("Downloaded media"))?;

    state
        .file_manager
        .open(Path::new(target))
        .map_err(AppError::from)?;
    Ok(())
}

use super::entity::{PostId, PostRecord, PostStatus};
use crate::domain::{DomainError, DomainResult};

/// Validates all PostRecord invariants.
/// Called by the store before every persisted write.
pub fn validate_post(post: &PostRecord) -> DomainResult<()> {
    validate_identity(post)?;
    validate_error_message(post)?;
    validate_stage_fields(post)?;
    validate_tags(post)?;
    Ok(())
}

/// `id` must be the hash of `normalized_url`
fn validate_identity(post: &PostRecord) -> DomainResult<()> {
    if post.url.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Post url cannot be empty".to_string(),
        ));
    }
    let expected = PostId::from_normalized(&post.normalized_url);
    if post.id != expected {
        return Err(DomainError::InvariantViolation(format!(
            "Post id {} does not match normalized url (expected {})",
            post.id, expected
        )));
    }
    Ok(())
}

fn validate_error_message(post: &PostRecord) -> DomainResult<()> {
    match (post.status, &post.error_message) {
        (PostStatus::Error, None) => Err(DomainError::InvariantViolation(format!(
            "Post {} is in error status without a message",
            post.id
        ))),
        (status, Some(_)) if status != PostStatus::Error => {
            Err(DomainError::InvariantViolation(format!(
                "Post {} carries an error message while {}",
                post.id, status
            )))
        }
        _ => Ok(()),
    }
}

fn validate_stage_fields(post: &PostRecord) -> DomainResult<()> {
    if post.status == PostStatus::Pending && (post.has_metadata() || post.is_scraped()) {
        return Err(DomainError::InvariantViolation(format!(
            "Pending post {} cannot carry scraped metadata",
            post.id
        )));
    }
    if post.has_media() && !post.is_scraped() {
        return Err(DomainError::InvariantViolation(format!(
            "Post {} has media files but was never scraped",
            post.id
        )));
    }
    Ok(())
}

fn validate_tags(post: &PostRecord) -> DomainResult<()> {
    if post.tags.iter().any(|t| t.trim().is_empty() || t.trim() != t) {
        return Err(DomainError::InvariantViolation(format!(
            "Post {} has blank or untrimmed tags",
            post.id
        )));
    }
    Ok(())
}

/// Invariants that must hold true for the Post domain:
///
/// 1. Identity is a pure function of the normalized URL
/// 2. Status `error` <=> error_message present
/// 3. Pending posts carry no scraped metadata
/// 4. Media files imply a completed scrape
/// 5. Tags and note never gate pipeline stage

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::link::normalize;

    fn stub() -> PostRecord {
        let n = normalize("https://threads.net/@a/post/XYZ");
        PostRecord::stub("https://threads.net/@a/post/XYZ", &n, "a.md", None)
    }

    #[test]
    fn test_valid_stub() {
        assert!(validate_post(&stub()).is_ok());
    }

    #[test]
    fn test_tampered_id_fails() {
        let mut post = stub();
        post.normalized_url = "https://threads.net/@a/post/OTHER".to_string();
        assert!(validate_post(&post).is_err());
    }

    #[test]
    fn test_stray_error_message_fails() {
        let mut post = stub();
        post.error_message = Some("leftover".to_string());
        assert!(validate_post(&post).is_err());
    }

    #[test]
    fn test_pending_with_metadata_fails() {
        let mut post = stub();
        post.likes = Some(3);
        assert!(validate_post(&post).is_err());
    }

    #[test]
    fn test_tags_and_note_allowed_while_pending() {
        let mut post = stub();
        post.add_tag("later");
        post.set_note(Some("check this".to_string()));
        assert!(validate_post(&post).is_ok());
    }
}

// src/repositories/post_repository.rs
//
// Post persistence

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Row};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use crate::db::ConnectionPool;
use crate::domain::{MediaType, Platform, PostId, PostRecord, PostStatus, Reachability};
use crate::error::AppResult;

pub trait PostRepository: Send + Sync {
    fn save(&self, post: &PostRecord) -> AppResult<()>;
    fn get_by_id(&self, id: &PostId) -> AppResult<Option<PostRecord>>;
    /// Records for `ids`, in the order given; unknown ids are skipped
    fn get_many(&self, ids: &[PostId]) -> AppResult<Vec<PostRecord>>;
    fn list_all(&self) -> AppResult<Vec<PostRecord>>;
    /// Returns false when no row existed
    fn delete(&self, id: &PostId) -> AppResult<bool>;
    fn exists(&self, id: &PostId) -> AppResult<bool>;
    fn count(&self) -> AppResult<usize>;
}

pub struct SqlitePostRepository {
    pool: Arc<ConnectionPool>,
}

fn decode_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn column_index(row: &Row, name: &str) -> usize {
    row.as_ref().column_index(name).unwrap_or_default()
}

fn parse_enum<T>(row: &Row, name: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(name)?;
    raw.parse::<T>().map_err(|e| decode_err(column_index(row, name), e))
}

fn parse_opt_enum<T>(row: &Row, name: &str) -> Result<Option<T>, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(name)?;
    raw.map(|s| s.parse::<T>().map_err(|e| decode_err(column_index(row, name), e)))
        .transpose()
}

fn parse_time(row: &Row, name: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(column_index(row, name), e))
}

fn parse_opt_time(row: &Row, name: &str) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let raw: Option<String> = row.get(name)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| decode_err(column_index(row, name), e))
    })
    .transpose()
}

fn parse_json<T>(row: &Row, name: &str) -> Result<T, rusqlite::Error>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(name)?;
    serde_json::from_str(&raw).map_err(|e| decode_err(column_index(row, name), e))
}

fn parse_count(row: &Row, name: &str) -> Result<Option<u64>, rusqlite::Error> {
    let raw: Option<i64> = row.get(name)?;
    Ok(raw.map(|v| v.max(0) as u64))
}

impl SqlitePostRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Map database row to PostRecord - returns rusqlite::Error for query_map compatibility
    fn row_to_post(row: &Row) -> Result<PostRecord, rusqlite::Error> {
        let id_raw: String = row.get("id")?;
        let id = PostId::parse(&id_raw).map_err(|e| decode_err(column_index(row, "id"), e))?;

        let tags: BTreeSet<String> = parse_json(row, "tags")?;

        Ok(PostRecord {
            id,
            url: row.get("url")?,
            normalized_url: row.get("normalized_url")?,
            platform: parse_enum::<Platform>(row, "platform")?,
            status: parse_enum::<PostStatus>(row, "status")?,
            source_file: row.get("source_file")?,
            source_context: row.get("source_context")?,
            author: row.get("author")?,
            author_url: row.get("author_url")?,
            title: row.get("title")?,
            content: row.get("content")?,
            posted_at: parse_opt_time(row, "posted_at")?,
            views: parse_count(row, "views")?,
            likes: parse_count(row, "likes")?,
            comments: parse_count(row, "comments")?,
            shares: parse_count(row, "shares")?,
            media_type: parse_opt_enum::<MediaType>(row, "media_type")?,
            media_paths: parse_json(row, "media_paths")?,
            media_urls: parse_json(row, "media_urls")?,
            thumbnail_url: row.get("thumbnail_url")?,
            thumbnail_path: row.get("thumbnail_path")?,
            tags,
            note: row.get("note")?,
            error_message: row.get("error_message")?,
            last_reachability: parse_opt_enum::<Reachability>(row, "last_reachability")?,
            validated_at: parse_opt_time(row, "validated_at")?,
            scraped_at: parse_opt_time(row, "scraped_at")?,
            downloaded_at: parse_opt_time(row, "downloaded_at")?,
            created_at: parse_time(row, "created_at")?,
            updated_at: parse_time(row, "updated_at")?,
        })
    }
}

impl PostRepository for SqlitePostRepository {
    fn save(&self, post: &PostRecord) -> AppResult<()> {
        let conn = self.pool.get()?;

        let media_paths_json = serde_json::to_string(&post.media_paths)?;
        let media_urls_json = serde_json::to_string(&post.media_urls)?;
        let tags_json = serde_json::to_string(&post.tags)?;

        conn.execute(
            "INSERT OR REPLACE INTO posts (
                id, url, normalized_url, platform, status,
                source_file, source_context,
                author, author_url, title, content, posted_at,
                views, likes, comments, shares, media_type,
                media_paths, media_urls, thumbnail_url, thumbnail_path,
                tags, note, error_message, last_reachability,
                validated_at, scraped_at, downloaded_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30
            )",
            params![
                post.id.as_str(),
                post.url,
                post.normalized_url,
                post.platform.as_str(),
                post.status.as_str(),
                post.source_file,
                post.source_context,
                post.author,
                post.author_url,
                post.title,
                post.content,
                post.posted_at.map(|dt| dt.to_rfc3339()),
                post.views.map(|v| v as i64),
                post.likes.map(|v| v as i64),
                post.comments.map(|v| v as i64),
                post.shares.map(|v| v as i64),
                post.media_type.map(|m| m.as_str()),
                media_paths_json,
                media_urls_json,
                post.thumbnail_url,
                post.thumbnail_path,
                tags_json,
                post.note,
                post.error_message,
                post.last_reachability.map(|r| r.as_str()),
                post.validated_at.map(|dt| dt.to_rfc3339()),
                post.scraped_at.map(|dt| dt.to_rfc3339()),
                post.downloaded_at.map(|dt| dt.to_rfc3339()),
                post.created_at.to_rfc3339(),
                post.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: &PostId) -> AppResult<Option<PostRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM posts WHERE id = ?1")?;

        match stmt.query_row(params![id.as_str()], Self::row_to_post) {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_many(&self, ids: &[PostId]) -> AppResult<Vec<PostRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM posts WHERE id IN ({})", placeholders);
        let mut stmt = conn.prepare(&sql)?;

        let mut found: HashMap<PostId, PostRecord> = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.as_str())), Self::row_to_post)?
            .map(|r| r.map(|post| (post.id.clone(), post)))
            .collect::<Result<_, _>>()?;

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    fn list_all(&self) -> AppResult<Vec<PostRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM posts ORDER BY created_at, id")?;

        let posts = stmt
            .query_map([], Self::row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn delete(&self, id: &PostId) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let affected = conn.execute("DELETE FROM posts WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    fn exists(&self, id: &PostId) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection_pool, initialize_database};
    use crate::domain::{normalize, PostMetadata, TransitionOrigin, ValidationReport};
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqlitePostRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_connection_pool(&dir.path().join("test.db")).unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        (dir, SqlitePostRepository::new(Arc::new(pool)))
    }

    fn stub(code: &str) -> PostRecord {
        let url = format!("https://instagram.com/p/{}", code);
        PostRecord::stub(&url, &normalize(&url), "notes/a.md", Some("ctx".to_string()))
    }

    #[test]
    fn test_save_and_load_full_record() {
        let (_dir, repo) = setup();
        let mut post = stub("FULL");
        post.record_validation(&ValidationReport::accessible(Some(200)), TransitionOrigin::Automated)
            .unwrap();
        post.apply_metadata(PostMetadata {
            author: Some("amy".to_string()),
            likes: Some(42),
            media_type: Some(MediaType::Carousel),
            media_urls: vec!["https://cdn/x.jpg".to_string()],
            ..Default::default()
        })
        .unwrap();
        post.add_tag("design");

        repo.save(&post).unwrap();
        let loaded = repo.get_by_id(&post.id).unwrap().unwrap();

        assert_eq!(loaded.id, post.id);
        assert_eq!(loaded.status, PostStatus::Accessible);
        assert_eq!(loaded.last_reachability, Some(Reachability::Accessible));
        assert_eq!(loaded.likes, Some(42));
        assert_eq!(loaded.media_type, Some(MediaType::Carousel));
        assert_eq!(loaded.media_urls, post.media_urls);
        assert!(loaded.tags.contains("design"));
        assert_eq!(loaded.source_context.as_deref(), Some("ctx"));
    }

    #[test]
    fn test_save_replaces_instead_of_duplicating() {
        let (_dir, repo) = setup();
        let mut post = stub("SAME");
        repo.save(&post).unwrap();
        post.set_note(Some("edited".to_string()));
        repo.save(&post).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(
            repo.get_by_id(&post.id).unwrap().unwrap().note.as_deref(),
            Some("edited")
        );
    }

    #[test]
    fn test_get_many_keeps_requested_order() {
        let (_dir, repo) = setup();
        let a = stub("A");
        let b = stub("B");
        repo.save(&a).unwrap();
        repo.save(&b).unwrap();

        let missing = PostId::from_normalized("https://nowhere");
        let loaded = repo
            .get_many(&[b.id.clone(), missing, a.id.clone()])
            .unwrap();
        let ids: Vec<_> = loaded.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_delete_reports_missing_rows() {
        let (_dir, repo) = setup();
        let post = stub("DEL");
        repo.save(&post).unwrap();

        assert!(repo.delete(&post.id).unwrap());
        assert!(!repo.delete(&post.id).unwrap());
        assert!(!repo.exists(&post.id).unwrap());
    }
}

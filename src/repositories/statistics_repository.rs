// src/repositories/statistics_repository.rs

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::statistics::{StatisticsSnapshot, StatisticsType};
use crate::error::{AppError, AppResult};

pub trait StatisticsRepository: Send + Sync {
    fn save_snapshot(&self, snapshot: &StatisticsSnapshot) -> AppResult<()>;
    fn get_latest(&self, kind: StatisticsType) -> AppResult<Option<StatisticsSnapshot>>;
    fn list_all_snapshots(&self) -> AppResult<Vec<StatisticsSnapshot>>;
    fn delete_all(&self) -> AppResult<()>;
}

pub struct SqliteStatisticsRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteStatisticsRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_snapshot(row: &Row) -> Result<StatisticsSnapshot, rusqlite::Error> {
        let id_str: String = row.get("id")?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let kind_raw: String = row.get("kind")?;
        let kind = kind_raw
            .parse::<StatisticsType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let value_json: String = row.get("value")?;
        let value = serde_json::from_str(&value_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        let generated_at = DateTime::parse_from_rfc3339(&row.get::<_, String>("generated_at")?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);

        Ok(StatisticsSnapshot {
            id,
            kind,
            value,
            generated_at,
        })
    }
}

impl StatisticsRepository for SqliteStatisticsRepository {
    fn save_snapshot(&self, snap: &StatisticsSnapshot) -> AppResult<()> {
        let conn = self.pool.get()?;
        let value_json = serde_json::to_string(&snap.value)?;

        // Only the latest snapshot per kind is kept.
        conn.execute(
            "DELETE FROM statistics_snapshots WHERE kind = ?1",
            params![snap.kind.to_string()],
        )?;
        conn.execute(
            "INSERT INTO statistics_snapshots (id, kind, value, generated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                snap.id.to_string(),
                snap.kind.to_string(),
                value_json,
                snap.generated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_latest(&self, kind: StatisticsType) -> AppResult<Option<StatisticsSnapshot>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, kind, value, generated_at FROM statistics_snapshots
             WHERE kind = ?1 ORDER BY generated_at DESC LIMIT 1",
        )?;

        match stmt.query_row(params![kind.to_string()], Self::row_to_snapshot) {
            Ok(snap) => Ok(Some(snap)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    fn list_all_snapshots(&self) -> AppResult<Vec<StatisticsSnapshot>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, kind, value, generated_at FROM statistics_snapshots ORDER BY generated_at DESC",
        )?;

        let snapshots: Vec<StatisticsSnapshot> = stmt
            .query_map([], Self::row_to_snapshot)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    fn delete_all(&self) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM statistics_snapshots", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection_pool, initialize_database};
    use crate::domain::Platform;

    #[test]
    fn test_latest_snapshot_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_connection_pool(&dir.path().join("s.db")).unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        let repo = SqliteStatisticsRepository::new(Arc::new(pool));

        repo.save_snapshot(&StatisticsSnapshot::new(
            StatisticsType::Global,
            serde_json::json!({"total": 1}),
        ))
        .unwrap();
        repo.save_snapshot(&StatisticsSnapshot::new(
            StatisticsType::Global,
            serde_json::json!({"total": 2}),
        ))
        .unwrap();
        repo.save_snapshot(&StatisticsSnapshot::new(
            StatisticsType::ByPlatform { platform: Platform::Threads },
            serde_json::json!({"total": 0}),
        ))
        .unwrap();

        let latest = repo.get_latest(StatisticsType::Global).unwrap().unwrap();
        assert_eq!(latest.value["total"], 2);
        assert_eq!(repo.list_all_snapshots().unwrap().len(), 2);

        repo.delete_all().unwrap();
        assert!(repo.get_latest(StatisticsType::Global).unwrap().is_none());
    }
}

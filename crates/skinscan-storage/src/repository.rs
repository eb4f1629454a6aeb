//! Scan history in SQLite.
//!
//! One row per finished analysis. Scalar metrics get their own columns; the
//! image list, concerns and recommendations are stored as JSON text.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use skinscan_core::{AnalysisRecord, ArtifactRef, SkinType};
use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS scans (
        id                   TEXT PRIMARY KEY,
        timestamp            INTEGER NOT NULL,
        overall_score        INTEGER NOT NULL,
        skin_age             INTEGER NOT NULL,
        hydration            INTEGER NOT NULL,
        elasticity           INTEGER NOT NULL,
        skin_type            TEXT NOT NULL,
        image_paths          TEXT NOT NULL,
        concerns_json        TEXT NOT NULL,
        recommendations_json TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_scans_timestamp ON scans (timestamp DESC);
";

const SELECT_COLUMNS: &str = "id, timestamp, overall_score, skin_age, hydration, elasticity, \
     skin_type, image_paths, concerns_json, recommendations_json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt JSON column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp in row {id}: {millis}")]
    InvalidTimestamp { id: String, millis: i64 },
    #[error(transparent)]
    SkinType(#[from] skinscan_core::types::UnknownSkinType),
}

/// Flat row as stored in the `scans` table.
struct ScanRow {
    id: String,
    timestamp: i64,
    overall_score: u32,
    skin_age: u32,
    hydration: u32,
    elasticity: u32,
    skin_type: String,
    image_paths: String,
    concerns_json: String,
    recommendations_json: String,
}

impl ScanRow {
    fn encode(record: &AnalysisRecord) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.id.clone(),
            timestamp: record.timestamp.timestamp_millis(),
            overall_score: record.overall_score,
            skin_age: record.skin_age,
            hydration: record.hydration,
            elasticity: record.elasticity,
            skin_type: record.skin_type.to_string(),
            image_paths: serde_json::to_string(&record.image_paths)?,
            concerns_json: serde_json::to_string(&record.concerns)?,
            recommendations_json: serde_json::to_string(&record.recommendations)?,
        })
    }

    fn decode(self) -> Result<AnalysisRecord, StorageError> {
        let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(self.timestamp).ok_or(
            StorageError::InvalidTimestamp {
                id: self.id.clone(),
                millis: self.timestamp,
            },
        )?;
        let image_paths: Vec<ArtifactRef> = serde_json::from_str(&self.image_paths)?;

        Ok(AnalysisRecord {
            timestamp,
            overall_score: self.overall_score,
            skin_age: self.skin_age,
            hydration: self.hydration,
            elasticity: self.elasticity,
            skin_type: self.skin_type.parse::<SkinType>()?,
            image_paths,
            concerns: serde_json::from_str(&self.concerns_json)?,
            recommendations: serde_json::from_str(&self.recommendations_json)?,
            id: self.id,
        })
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            overall_score: row.get(2)?,
            skin_age: row.get(3)?,
            hydration: row.get(4)?,
            elasticity: row.get(5)?,
            skin_type: row.get(6)?,
            image_paths: row.get(7)?,
            concerns_json: row.get(8)?,
            recommendations_json: row.get(9)?,
        })
    }
}

/// Persistence for finished analyses.
pub struct ScanRepository {
    conn: Connection,
}

impl ScanRepository {
    /// Open (or create) the database file, creating parent directories.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = Connection::open(path).await?;
        tracing::info!(path = %path.display(), "scan database opened");
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Store a record, replacing any existing row with the same id.
    pub async fn insert(&self, record: &AnalysisRecord) -> Result<(), StorageError> {
        let row = ScanRow::encode(record)?;
        let id = row.id.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO scans (id, timestamp, overall_score, skin_age, \
                     hydration, elasticity, skin_type, image_paths, concerns_json, \
                     recommendations_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        row.id,
                        row.timestamp,
                        row.overall_score,
                        row.skin_age,
                        row.hydration,
                        row.elasticity,
                        row.skin_type,
                        row.image_paths,
                        row.concerns_json,
                        row.recommendations_json,
                    ],
                )?;
                Ok(())
            })
            .await?;
        tracing::info!(%id, "scan saved");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, StorageError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT {SELECT_COLUMNS} FROM scans WHERE id = ?1"),
                        [&id],
                        ScanRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        row.map(ScanRow::decode).transpose()
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<AnalysisRecord>, StorageError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM scans ORDER BY timestamp DESC"
                ))?;
                let rows = stmt
                    .query_map([], ScanRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(ScanRow::decode).collect()
    }

    /// Remove one record. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        let removed = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM scans WHERE id = ?1", [&id])?))
            .await?;
        Ok(removed > 0)
    }

    /// Remove every record. Returns how many were deleted.
    pub async fn clear(&self) -> Result<usize, StorageError> {
        let removed = self
            .conn
            .call(|conn| Ok(conn.execute("DELETE FROM scans", [])?))
            .await?;
        tracing::info!(removed, "scan history cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinscan_core::{
        ConcernType, Recommendation, RecommendationType, Severity, SkinConcern,
    };

    fn record(id: &str, millis: i64) -> AnalysisRecord {
        AnalysisRecord {
            id: id.to_string(),
            timestamp: DateTime::from_timestamp_millis(millis).unwrap(),
            overall_score: 84,
            skin_age: 31,
            hydration: 72,
            elasticity: 68,
            skin_type: SkinType::Combination,
            image_paths: vec![
                ArtifactRef::new("/scans/front.jpg"),
                ArtifactRef::new("/scans/left.jpg"),
                ArtifactRef::new("/scans/right.jpg"),
            ],
            concerns: vec![SkinConcern {
                concern_type: ConcernType::Pores,
                severity: Severity::Mild,
                affected_area: "T-zone".into(),
                percentage: 22,
                description: "Enlarged pores visible in the nose and forehead area.".into(),
            }],
            recommendations: vec![Recommendation::new(
                RecommendationType::Treatment,
                "Deep Cleansing Facial",
                "Professional extraction.",
            )],
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = ScanRepository::open_in_memory().await.unwrap();
        let saved = record("a", 1_700_000_000_123);
        repo.insert(&saved).await.unwrap();

        let loaded = repo.get("a").await.unwrap().expect("record exists");
        assert_eq!(loaded, saved);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = ScanRepository::open_in_memory().await.unwrap();
        repo.insert(&record("old", 1_000)).await.unwrap();
        repo.insert(&record("new", 3_000)).await.unwrap();
        repo.insert(&record("mid", 2_000)).await.unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_insert_replaces_same_id() {
        let repo = ScanRepository::open_in_memory().await.unwrap();
        repo.insert(&record("a", 1_000)).await.unwrap();
        let mut updated = record("a", 1_000);
        updated.overall_score = 91;
        repo.insert(&updated).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].overall_score, 91);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repo = ScanRepository::open_in_memory().await.unwrap();
        repo.insert(&record("a", 1_000)).await.unwrap();
        repo.insert(&record("b", 2_000)).await.unwrap();
        repo.insert(&record("c", 3_000)).await.unwrap();

        assert!(repo.delete("b").await.unwrap());
        assert!(!repo.delete("b").await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 2);

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_file_persists_across_connections() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/scans.db");
        {
            let repo = ScanRepository::open(&path).await.unwrap();
            repo.insert(&record("kept", 5_000)).await.unwrap();
        }
        let repo = ScanRepository::open(&path).await.unwrap();
        assert_eq!(repo.get("kept").await.unwrap().unwrap().id, "kept");
    }
}

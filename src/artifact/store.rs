//! Append-only versioned artifact persistence.
//!
//! Every save inserts a new version record; nothing is ever mutated in
//! place. The current version of an artifact is the record with the greatest
//! `created_at` for its id.

use super::ArtifactKind;
use crate::config::{ArtifactStoreProvider, Settings};
use crate::error::{LaerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A new version to be appended.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub artifact_id: Uuid,
    pub title: String,
    pub kind: ArtifactKind,
    pub content: String,
    pub owner: Option<String>,
}

/// One stored version of an artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtifactVersion {
    pub version_id: Uuid,
    pub artifact_id: Uuid,
    pub title: String,
    pub kind: ArtifactKind,
    pub content: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Trait for artifact store implementations.
///
/// Writes are append-only. Implementations serialize concurrent writes (the
/// connection lock here); the `kind` of an artifact id is constant across all
/// its versions and a save that would change it is rejected.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Append a new version record.
    async fn save(&self, draft: &ArtifactDraft) -> Result<ArtifactVersion>;

    /// Get the current (latest) version for an artifact id.
    async fn get_latest(&self, artifact_id: Uuid) -> Result<Option<ArtifactVersion>>;

    /// Get every version for an artifact id, oldest first.
    async fn get_all_versions(&self, artifact_id: Uuid) -> Result<Vec<ArtifactVersion>>;

    /// Get the latest version of every artifact, most recent first.
    async fn list_latest(&self) -> Result<Vec<ArtifactVersion>>;

    /// Total number of stored version records.
    async fn version_count(&self) -> Result<usize>;
}

/// Open the store configured in settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn ArtifactStore>> {
    match settings.artifacts.provider {
        ArtifactStoreProvider::Sqlite => Ok(Arc::new(SqliteArtifactStore::new(
            &settings.artifacts_db_path(),
        )?)),
        ArtifactStoreProvider::Memory => Ok(Arc::new(MemoryArtifactStore::new())),
    }
}

/// SQLite-backed artifact store.
pub struct SqliteArtifactStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS artifact_versions (
    version_id TEXT PRIMARY KEY,
    artifact_id TEXT NOT NULL,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    owner TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_versions_artifact_id ON artifact_versions(artifact_id);
CREATE INDEX IF NOT EXISTS idx_versions_created_at ON artifact_versions(created_at);
"#;

impl SqliteArtifactStore {
    /// Create a new SQLite artifact store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized artifact store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtifactVersion> {
        let version_id: String = row.get(0)?;
        let artifact_id: String = row.get(1)?;
        let kind: String = row.get(3)?;
        let created_at: String = row.get(6)?;

        Ok(ArtifactVersion {
            version_id: Uuid::parse_str(&version_id).unwrap_or_default(),
            artifact_id: Uuid::parse_str(&artifact_id).unwrap_or_default(),
            title: row.get(2)?,
            kind: ArtifactKind::from(kind),
            content: row.get(4)?,
            owner: row.get(5)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

const VERSION_COLUMNS: &str =
    "version_id, artifact_id, title, kind, content, owner, created_at";

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    #[instrument(skip(self, draft), fields(artifact_id = %draft.artifact_id))]
    async fn save(&self, draft: &ArtifactDraft) -> Result<ArtifactVersion> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        // kind is constant across all versions of an id
        let existing_kind: Option<String> = conn
            .query_row(
                "SELECT kind FROM artifact_versions WHERE artifact_id = ?1 LIMIT 1",
                params![draft.artifact_id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        if let Some(kind) = existing_kind {
            if ArtifactKind::from(kind.clone()) != draft.kind {
                return Err(LaerError::ArtifactStore(format!(
                    "Artifact {} is kind '{}', cannot save a '{}' version",
                    draft.artifact_id, kind, draft.kind
                )));
            }
        }

        let version = ArtifactVersion {
            version_id: Uuid::new_v4(),
            artifact_id: draft.artifact_id,
            title: draft.title.clone(),
            kind: draft.kind.clone(),
            content: draft.content.clone(),
            owner: draft.owner.clone(),
            created_at: Utc::now(),
        };

        conn.execute(
            r#"
            INSERT INTO artifact_versions
            (version_id, artifact_id, title, kind, content, owner, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                version.version_id.to_string(),
                version.artifact_id.to_string(),
                version.title,
                version.kind.as_str(),
                version.content,
                version.owner,
                version.created_at.to_rfc3339(),
            ],
        )?;

        debug!("Saved version {} of artifact {}", version.version_id, version.artifact_id);
        Ok(version)
    }

    #[instrument(skip(self))]
    async fn get_latest(&self, artifact_id: Uuid) -> Result<Option<ArtifactVersion>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        let result = conn.query_row(
            &format!(
                "SELECT {} FROM artifact_versions WHERE artifact_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                VERSION_COLUMNS
            ),
            params![artifact_id.to_string()],
            Self::row_to_version,
        );

        match result {
            Ok(version) => Ok(Some(version)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn get_all_versions(&self, artifact_id: Uuid) -> Result<Vec<ArtifactVersion>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artifact_versions WHERE artifact_id = ?1 \
             ORDER BY created_at ASC, rowid ASC",
            VERSION_COLUMNS
        ))?;

        let versions = stmt
            .query_map(params![artifact_id.to_string()], Self::row_to_version)?
            .filter_map(|v| v.ok())
            .collect();

        Ok(versions)
    }

    #[instrument(skip(self))]
    async fn list_latest(&self) -> Result<Vec<ArtifactVersion>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        // Append-only inserts mean max rowid per id is the latest version.
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artifact_versions WHERE rowid IN \
             (SELECT MAX(rowid) FROM artifact_versions GROUP BY artifact_id) \
             ORDER BY created_at DESC, rowid DESC",
            VERSION_COLUMNS
        ))?;

        let versions = stmt
            .query_map([], Self::row_to_version)?
            .filter_map(|v| v.ok())
            .collect();

        Ok(versions)
    }

    async fn version_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM artifact_versions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// In-memory artifact store.
pub struct MemoryArtifactStore {
    versions: Mutex<Vec<ArtifactVersion>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            versions: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, draft: &ArtifactDraft) -> Result<ArtifactVersion> {
        let mut versions = self
            .versions
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        if let Some(existing) = versions.iter().find(|v| v.artifact_id == draft.artifact_id) {
            if existing.kind != draft.kind {
                return Err(LaerError::ArtifactStore(format!(
                    "Artifact {} is kind '{}', cannot save a '{}' version",
                    draft.artifact_id, existing.kind, draft.kind
                )));
            }
        }

        let version = ArtifactVersion {
            version_id: Uuid::new_v4(),
            artifact_id: draft.artifact_id,
            title: draft.title.clone(),
            kind: draft.kind.clone(),
            content: draft.content.clone(),
            owner: draft.owner.clone(),
            created_at: Utc::now(),
        };

        versions.push(version.clone());
        Ok(version)
    }

    async fn get_latest(&self, artifact_id: Uuid) -> Result<Option<ArtifactVersion>> {
        let versions = self
            .versions
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        // Later insertions win created_at ties.
        Ok(versions
            .iter()
            .enumerate()
            .filter(|(_, v)| v.artifact_id == artifact_id)
            .max_by_key(|(i, v)| (v.created_at, *i))
            .map(|(_, v)| v.clone()))
    }

    async fn get_all_versions(&self, artifact_id: Uuid) -> Result<Vec<ArtifactVersion>> {
        let versions = self
            .versions
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        Ok(versions
            .iter()
            .filter(|v| v.artifact_id == artifact_id)
            .cloned()
            .collect())
    }

    async fn list_latest(&self) -> Result<Vec<ArtifactVersion>> {
        let versions = self
            .versions
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;

        let mut latest: Vec<ArtifactVersion> = Vec::new();
        for (i, version) in versions.iter().enumerate() {
            let newer_exists = versions
                .iter()
                .enumerate()
                .any(|(j, other)| {
                    other.artifact_id == version.artifact_id
                        && (other.created_at, j) > (version.created_at, i)
                });
            if !newer_exists {
                latest.push(version.clone());
            }
        }
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(latest)
    }

    async fn version_count(&self) -> Result<usize> {
        let versions = self
            .versions
            .lock()
            .map_err(|e| LaerError::ArtifactStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(versions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(artifact_id: Uuid, kind: ArtifactKind, content: &str) -> ArtifactDraft {
        ArtifactDraft {
            artifact_id,
            title: "Test artifact".to_string(),
            kind,
            content: content.to_string(),
            owner: Some("tester".to_string()),
        }
    }

    #[tokio::test]
    async fn test_versions_share_id_latest_wins() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let id = Uuid::new_v4();

        let v1 = store
            .save(&draft(id, ArtifactKind::Quiz, "version one"))
            .await
            .unwrap();
        let v2 = store
            .save(&draft(id, ArtifactKind::Quiz, "version two"))
            .await
            .unwrap();
        assert_ne!(v1.version_id, v2.version_id);

        let all = store.get_all_versions(id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "version one");
        assert_eq!(all[1].content, "version two");

        let latest = store.get_latest(id).await.unwrap().unwrap();
        assert_eq!(latest.version_id, v2.version_id);
        assert_eq!(latest.content, "version two");
    }

    #[tokio::test]
    async fn test_kind_constant_per_id() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let id = Uuid::new_v4();

        store
            .save(&draft(id, ArtifactKind::Quiz, "{}"))
            .await
            .unwrap();
        let err = store
            .save(&draft(id, ArtifactKind::StudyPlan, "{}"))
            .await;
        assert!(err.is_err());

        assert_eq!(store.version_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_latest_missing() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let latest = store.get_latest(Uuid::new_v4()).await.unwrap();
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_list_latest_one_row_per_artifact() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.save(&draft(a, ArtifactKind::Quiz, "a1")).await.unwrap();
        store.save(&draft(a, ArtifactKind::Quiz, "a2")).await.unwrap();
        store
            .save(&draft(b, ArtifactKind::StudyPlan, "b1"))
            .await
            .unwrap();

        let latest = store.list_latest().await.unwrap();
        assert_eq!(latest.len(), 2);
        let for_a = latest.iter().find(|v| v.artifact_id == a).unwrap();
        assert_eq!(for_a.content, "a2");
    }

    #[tokio::test]
    async fn test_memory_store_matches_sqlite_behavior() {
        let store = MemoryArtifactStore::new();
        let id = Uuid::new_v4();

        store
            .save(&draft(id, ArtifactKind::Quiz, "one"))
            .await
            .unwrap();
        store
            .save(&draft(id, ArtifactKind::Quiz, "two"))
            .await
            .unwrap();
        assert!(store
            .save(&draft(id, ArtifactKind::Text, "bad"))
            .await
            .is_err());

        let latest = store.get_latest(id).await.unwrap().unwrap();
        assert_eq!(latest.content, "two");
        assert_eq!(store.get_all_versions(id).await.unwrap().len(), 2);
        assert_eq!(store.list_latest().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_on_disk_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.db");
        let id = Uuid::new_v4();

        {
            let store = SqliteArtifactStore::new(&path).unwrap();
            store
                .save(&draft(id, ArtifactKind::Quiz, "persisted"))
                .await
                .unwrap();
        }

        let store = SqliteArtifactStore::new(&path).unwrap();
        let latest = store.get_latest(id).await.unwrap().unwrap();
        assert_eq!(latest.content, "persisted");
    }
}

//! SQLite-backed vector store
//!
//! Embeddings are stored as little-endian `f32` blobs next to their JSON
//! metadata and text. Metadata predicates run in SQL via `json_extract`;
//! similarity is computed in Rust over the matching rows.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use fitrag_core::config::EngineConfig;
use fitrag_core::document::{Document, Metadata, MetadataFilter, MetadataValue};
use fitrag_core::rag::{CollectionInfo, ScoredDocument, VectorRecord, VectorStore};
use fitrag_core::store::{cosine_similarity, rank};

use crate::db::Database;
use crate::error::{Result, StoreError};

/// Persistent vector store over a single SQLite file
#[derive(Clone)]
pub struct SqliteVectorStore {
    db: Database,
}

impl SqliteVectorStore {
    /// Create or open a store at the given path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        info!("Opening vector store at: {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        init_schema(&conn)?;
        Ok(Self {
            db: Database::new(conn, path),
        })
    }

    /// Open the store at `storage.vector_store_path`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::open(&config.storage.vector_store_path)
    }

    /// In-memory store, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            db: Database::new(conn, PathBuf::from(":memory:")),
        })
    }

    /// Database file path
    pub fn path(&self) -> &std::path::Path {
        self.db.path()
    }

    /// Names of all collections, sorted
    pub async fn collection_names(&self) -> Result<Vec<String>> {
        self.db
            .run(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Initializing vector store schema");

    conn.execute_batch("PRAGMA journal_mode = WAL")?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL,
            document TEXT NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
        )",
        [],
    )?;

    // Alias targets are not foreign keys: an alias may briefly outlive its
    // collection during cleanup and resolves to a name the caller re-checks
    conn.execute(
        "CREATE TABLE IF NOT EXISTS aliases (
            alias TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn collection_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM collections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn require_collection(conn: &Connection, name: &str) -> Result<()> {
    if collection_exists(conn, name)? {
        Ok(())
    } else {
        Err(StoreError::CollectionNotFound(name.to_string()))
    }
}

fn count_entries(conn: &Connection, name: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE collection = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Encode an embedding as little-endian `f32`s
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a blob written by [`encode_embedding`]; `None` if the length is not
/// a multiple of four
pub fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// JSON path for a top-level metadata key
fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('"', "\\\""))
}

/// The SQL value `json_extract` yields for a metadata scalar
fn sql_value(value: &MetadataValue) -> Value {
    match value {
        MetadataValue::Bool(b) => Value::Integer(i64::from(*b)),
        MetadataValue::Int(i) => Value::Integer(*i),
        MetadataValue::Float(f) => Value::Real(*f),
        MetadataValue::Text(s) => Value::Text(s.clone()),
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> fitrag_core::error::Result<()> {
        let name = name.to_string();
        let metadata = serde_json::to_string(&metadata).map_err(StoreError::from)?;
        self.db
            .run(move |conn| {
                if collection_exists(conn, &name)? {
                    return Err(StoreError::CollectionExists(name));
                }
                conn.execute(
                    "INSERT INTO collections (name, metadata, created_at) VALUES (?1, ?2, ?3)",
                    params![name, metadata, Utc::now().to_rfc3339()],
                )?;
                debug!(collection = %name, "created collection");
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> fitrag_core::error::Result<Option<CollectionInfo>> {
        let name = name.to_string();
        let info = self
            .db
            .run(move |conn| {
                let metadata: Option<String> = conn
                    .query_row(
                        "SELECT metadata FROM collections WHERE name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(metadata) = metadata else {
                    return Ok(None);
                };
                Ok(Some(CollectionInfo {
                    metadata: serde_json::from_str(&metadata)?,
                    count: count_entries(conn, &name)?,
                    name,
                }))
            })
            .await?;
        Ok(info)
    }

    async fn delete_collection(&self, name: &str) -> fitrag_core::error::Result<bool> {
        let name = name.to_string();
        let existed = self
            .db
            .run(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE collection = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
                tx.commit()?;
                if deleted > 0 {
                    debug!(collection = %name, "deleted collection");
                }
                Ok(deleted > 0)
            })
            .await?;
        Ok(existed)
    }

    async fn count(&self, name: &str) -> fitrag_core::error::Result<usize> {
        let name = name.to_string();
        let count = self
            .db
            .run(move |conn| {
                require_collection(conn, &name)?;
                count_entries(conn, &name)
            })
            .await?;
        Ok(count)
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> fitrag_core::error::Result<()> {
        let collection = collection.to_string();
        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;
                require_collection(&tx, &collection)?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR REPLACE INTO entries (collection, id, embedding, metadata, document)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?;
                    for record in &records {
                        stmt.execute(params![
                            collection,
                            record.id,
                            encode_embedding(&record.embedding),
                            serde_json::to_string(&record.metadata)?,
                            record.text,
                        ])?;
                    }
                }
                tx.commit()?;
                debug!(collection = %collection, count = records.len(), "upserted records");
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &MetadataFilter,
        k: usize,
    ) -> fitrag_core::error::Result<Vec<ScoredDocument>> {
        let collection = collection.to_string();
        let embedding = embedding.to_vec();
        let path = json_path(&filter.key);
        let value = sql_value(&filter.value);

        let hits = self
            .db
            .run(move |conn| {
                require_collection(conn, &collection)?;
                let mut stmt = conn.prepare(
                    "SELECT id, embedding, metadata, document FROM entries
                     WHERE collection = ?1 AND json_extract(metadata, ?2) = ?3",
                )?;
                let rows = stmt
                    .query_map(params![collection, path, value], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut scored = Vec::with_capacity(rows.len());
                for (id, blob, metadata, text) in rows {
                    let stored = decode_embedding(&blob).ok_or_else(|| StoreError::CorruptEmbedding {
                        collection: collection.clone(),
                        id: id.clone(),
                        len: blob.len(),
                    })?;
                    let metadata: Metadata = serde_json::from_str(&metadata)?;
                    scored.push(ScoredDocument {
                        score: cosine_similarity(&embedding, &stored),
                        document: Document { id, text, metadata },
                    });
                }
                Ok(rank(scored, k))
            })
            .await?;
        Ok(hits)
    }

    async fn set_alias(&self, alias: &str, collection: &str) -> fitrag_core::error::Result<()> {
        let alias = alias.to_string();
        let collection = collection.to_string();
        self.db
            .run(move |conn| {
                require_collection(conn, &collection)?;
                conn.execute(
                    "INSERT INTO aliases (alias, collection, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(alias) DO UPDATE SET
                        collection = excluded.collection,
                        updated_at = excluded.updated_at",
                    params![alias, collection, Utc::now().to_rfc3339()],
                )?;
                info!(%alias, %collection, "alias updated");
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn resolve_alias(&self, alias: &str) -> fitrag_core::error::Result<Option<String>> {
        let alias = alias.to_string();
        let target = self
            .db
            .run(move |conn| {
                let target = conn
                    .query_row(
                        "SELECT collection FROM aliases WHERE alias = ?1",
                        params![alias],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(target)
            })
            .await?;
        Ok(target)
    }
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("path", &self.db.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitrag_core::document::SourceKind;

    fn record(source: SourceKind, id: i64, embedding: Vec<f32>) -> VectorRecord {
        let doc = Document::new(source, id, format!("{source} {id}"), Metadata::new());
        VectorRecord::from_document(&doc, embedding)
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let values = vec![0.5, -1.25, f32::MIN_POSITIVE, 3.0e7];
        let bytes = encode_embedding(&values);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_embedding(&bytes).unwrap(), values);
        assert!(decode_embedding(&bytes[..7]).is_none());
    }

    #[test]
    fn test_json_path_quotes_key() {
        assert_eq!(json_path("source"), "$.\"source\"");
        assert_eq!(json_path("is_veg"), "$.\"is_veg\"");
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let meta = BTreeMap::from([("embedding_model".to_string(), "m".to_string())]);

        store.create_collection("c1", meta.clone()).await.unwrap();
        assert!(store.create_collection("c1", meta.clone()).await.is_err());

        store
            .upsert(
                "c1",
                vec![
                    record(SourceKind::Exercise, 1, vec![1.0, 0.0]),
                    record(SourceKind::FoodItem, 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        // Same id replaces
        store
            .upsert("c1", vec![record(SourceKind::Exercise, 1, vec![0.6, 0.8])])
            .await
            .unwrap();

        let info = store.get_collection("c1").await.unwrap().unwrap();
        assert_eq!(info.count, 2);
        assert_eq!(info.metadata, meta);

        assert!(store.delete_collection("c1").await.unwrap());
        assert!(!store.delete_collection("c1").await.unwrap());
        assert!(store.get_collection("c1").await.unwrap().is_none());
        assert!(store.count("c1").await.is_err());
    }

    #[tokio::test]
    async fn test_query_filters_in_sql_and_ranks() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.create_collection("c", BTreeMap::new()).await.unwrap();
        store
            .upsert(
                "c",
                vec![
                    record(SourceKind::Exercise, 1, vec![1.0, 0.0]),
                    record(SourceKind::Exercise, 2, vec![0.7, 0.7]),
                    record(SourceKind::Exercise, 3, vec![0.0, 1.0]),
                    record(SourceKind::FoodItem, 4, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .query("c", &[1.0, 0.1], &MetadataFilter::source(SourceKind::Exercise), 2)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["exercise:1", "exercise:2"]);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].document.row_id(), Some(1));

        let by_id = store
            .query("c", &[1.0, 0.0], &MetadataFilter::eq("id", 4_i64), 10)
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].document.source(), Some(SourceKind::FoodItem));
    }

    #[tokio::test]
    async fn test_alias_requires_existing_collection() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        assert!(store.set_alias("live", "nope").await.is_err());
        assert_eq!(store.resolve_alias("live").await.unwrap(), None);

        store.create_collection("a", BTreeMap::new()).await.unwrap();
        store.create_collection("b", BTreeMap::new()).await.unwrap();
        store.set_alias("live", "a").await.unwrap();
        store.set_alias("live", "b").await.unwrap();
        assert_eq!(store.resolve_alias("live").await.unwrap().as_deref(), Some("b"));
    }
}

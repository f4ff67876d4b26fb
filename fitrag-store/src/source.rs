//! Read-only access to the relational source tables

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::debug;

use fitrag_core::config::EngineConfig;
use fitrag_core::loader::{ExerciseRecord, FoodItemRecord};
use fitrag_core::rag::{SourceCounts, SourceStore};

use crate::error::{Result, StoreError};

const EXERCISE_QUERY: &str = "SELECT id, name, muscle_group, difficulty, equipment_required, description, video_url
     FROM exercise
     ORDER BY id";

const FOOD_ITEM_QUERY: &str = "SELECT id, name, category, calories_per_100g, protein_per_100g,
            carbs_per_100g, fats_per_100g, vitamins, minerals,
            serving_description, is_veg, description
     FROM food_item
     ORDER BY id";

/// Source store over the application's SQLite database.
///
/// A fresh read-only connection is opened per call, so the engine can start
/// before the database exists and picks up a replaced file on the next read.
#[derive(Debug, Clone)]
pub struct SqliteSourceStore {
    path: PathBuf,
}

impl SqliteSourceStore {
    /// Store reading from `path`; nothing is opened yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store reading from `storage.source_db_path`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.storage.source_db_path)
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<ExerciseRecord> {
    Ok(ExerciseRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        muscle_group: row.get(2)?,
        difficulty: row.get(3)?,
        equipment_required: row.get(4)?,
        description: row.get(5)?,
        video_url: row.get(6)?,
    })
}

fn food_item_from_row(row: &Row<'_>) -> rusqlite::Result<FoodItemRecord> {
    Ok(FoodItemRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        calories_per_100g: row.get(3)?,
        protein_per_100g: row.get(4)?,
        carbs_per_100g: row.get(5)?,
        fats_per_100g: row.get(6)?,
        vitamins: row.get(7)?,
        minerals: row.get(8)?,
        serving_description: row.get(9)?,
        is_veg: row.get(10)?,
        description: row.get(11)?,
    })
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

#[async_trait]
impl SourceStore for SqliteSourceStore {
    async fn exercises(&self) -> fitrag_core::error::Result<Vec<ExerciseRecord>> {
        let rows = self
            .read(|conn| {
                let mut stmt = conn.prepare(EXERCISE_QUERY)?;
                let rows = stmt
                    .query_map([], exercise_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        debug!(count = rows.len(), "loaded exercise rows");
        Ok(rows)
    }

    async fn food_items(&self) -> fitrag_core::error::Result<Vec<FoodItemRecord>> {
        let rows = self
            .read(|conn| {
                let mut stmt = conn.prepare(FOOD_ITEM_QUERY)?;
                let rows = stmt
                    .query_map([], food_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        debug!(count = rows.len(), "loaded food item rows");
        Ok(rows)
    }

    async fn counts(&self) -> fitrag_core::error::Result<SourceCounts> {
        let counts = self
            .read(|conn| {
                Ok(SourceCounts {
                    exercises: count_rows(conn, "exercise")?,
                    food_items: count_rows(conn, "food_item")?,
                })
            })
            .await?;
        Ok(counts)
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Corrupt embedding in {collection}/{id}: {len} bytes")]
    CorruptEmbedding {
        collection: String,
        id: String,
        len: usize,
    },

    #[error("Database worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for fitrag_core::error::Error {
    fn from(err: StoreError) -> Self {
        fitrag_core::error::Error::store(err.to_string())
    }
}

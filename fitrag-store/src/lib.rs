//! # fitrag-store: SQLite stores for fitrag
//!
//! - **Vector store** ([`SqliteVectorStore`]): named collections of embedded
//!   documents plus an alias table, so a rebuilt collection can be swapped in
//!   with a single row update
//! - **Source store** ([`SqliteSourceStore`]): read-only access to the
//!   `exercise` and `food_item` tables the documents are built from
//!
//! Both run their SQLite work on the blocking thread pool.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fitrag_core::rag::VectorStore;
//! use fitrag_store::SqliteVectorStore;
//!
//! # async fn demo() -> fitrag_core::error::Result<()> {
//! let store = Arc::new(SqliteVectorStore::open("./chroma_db/fitrag.db")?);
//! let live = store.resolve_alias("fitfusion_collection").await?;
//! println!("serving {live:?}");
//! # Ok(())
//! # }
//! ```

mod db;
pub mod error;
pub mod source;
pub mod vector;

pub use error::{Result, StoreError};
pub use source::SqliteSourceStore;
pub use vector::SqliteVectorStore;

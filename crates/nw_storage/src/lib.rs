use std::path::Path;
use std::sync::Arc;

use nw_core::blobs::BlobStore;
use nw_core::storage::{ArticleRepository, CategoryRepository, SourceRepository};
use nw_core::{Error, Result};

pub mod backends;

pub use backends::*;

/// Handles to one storage backend's repositories and blob store.
#[derive(Clone)]
pub struct Backend {
    pub articles: Arc<dyn ArticleRepository>,
    pub sources: Arc<dyn SourceRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Build a backend by name: `memory` or `sqlite` (the latter needs a
/// database path).
pub async fn create_storage(kind: &str, db_path: Option<&Path>) -> Result<Backend> {
    match kind {
        "memory" => {
            let storage = Arc::new(memory::MemoryStorage::new());
            Ok(Backend {
                articles: storage.clone(),
                sources: storage.clone(),
                categories: storage,
                blobs: Arc::new(memory::MemoryBlobStore::new()),
            })
        }
        "sqlite" => {
            let path = db_path
                .ok_or_else(|| Error::Storage("sqlite backend needs a database path".to_string()))?;
            let storage = Arc::new(sqlite::SqliteStorage::open(path).await?);
            Ok(Backend {
                articles: storage.clone(),
                sources: storage.clone(),
                categories: storage.clone(),
                blobs: storage,
            })
        }
        other => Err(Error::Storage(format!("unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Backend};
}

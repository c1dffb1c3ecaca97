pub mod blobs;
pub mod cache;
pub mod error;
pub mod models;
pub mod storage;
pub mod text;

pub use error::Error;
pub use models::{
    Article, BlobMetadata, BlobRole, Candidate, Category, FetchMethod, PagedResult,
    ScrapingConfig, Source,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::blobs::BlobStore;
    pub use crate::cache::CacheStore;
    pub use crate::storage::{ArticleRepository, CategoryRepository, SourceRepository};
    pub use crate::{Article, Candidate, Category, Error, FetchMethod, Result, Source};
}

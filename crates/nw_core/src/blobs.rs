use async_trait::async_trait;

use crate::models::BlobMetadata;
use crate::Result;

/// Binary object storage for images, addressed by opaque id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes with metadata and return the new blob's id.
    async fn upload(&self, bytes: Vec<u8>, filename: &str, meta: BlobMetadata) -> Result<String>;

    /// Bytes by id. Unknown or malformed ids yield None.
    async fn download(&self, id: &str) -> Result<Option<Vec<u8>>>;

    async fn metadata(&self, id: &str) -> Result<Option<BlobMetadata>>;

    /// Link a derived thumbnail to its original.
    async fn set_thumbnail(&self, id: &str, thumb_id: &str) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::name::StoredName;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An open blob and its length in bytes.
pub type SizedReader = (BoxReader, u64);

/// Name-addressed blob storage for uploaded assets.
///
/// Names are generated by the store on `put` and are never reused. Read
/// operations take the raw, untrusted name and validate it before touching
/// the backing medium.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a freshly generated name carrying `extension`.
    async fn put(&self, data: &[u8], extension: &str) -> Result<StoredName, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let (mut reader, size) = self.get_stream(name).await?;
        let mut buf = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open a blob for streaming. The length is taken from the same open
    /// handle the reader uses.
    async fn get_stream(&self, name: &str) -> Result<SizedReader, StorageError>;
}

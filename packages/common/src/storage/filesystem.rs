use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::error::StorageError;
use super::name::StoredName;
use super::traits::{BlobStore, SizedReader};

/// How many fresh names `put` tries before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Filesystem-backed blob store.
///
/// Blobs live flat in `{base_path}/{name}`. The directory is created on the
/// first write, not at construction.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
    clock: Clock,
    ready: OnceCell<()>,
}

impl FilesystemBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            base_path: base_path.into(),
            max_size,
            clock: Arc::new(Utc::now),
            ready: OnceCell::new(),
        }
    }

    /// Replace the time source used for name generation.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, name: &StoredName) -> PathBuf {
        self.base_path.join(name.as_str())
    }

    /// `create_dir_all` tolerates a concurrent creator, and the cell keeps
    /// later writes from repeating the syscall.
    async fn ensure_dir(&self) -> Result<(), StorageError> {
        self.ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.base_path).await?;
                debug!(path = %self.base_path.display(), "Blob directory ready");
                Ok::<_, StorageError>(())
            })
            .await?;
        Ok(())
    }

    async fn open_file(&self, name: &str) -> Result<(fs::File, u64), StorageError> {
        let name = StoredName::parse(name)?;
        let path = self.blob_path(&name);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.into()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(name.into()));
        }
        Ok((file, meta.len()))
    }
}

async fn write_durably(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8], extension: &str) -> Result<StoredName, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        self.ensure_dir().await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = StoredName::generate((self.clock)(), extension)?;
            let path = self.blob_path(&name);

            // `create_new` makes the name reservation atomic on disk.
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(name = %name, "Generated blob name already taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_durably(&mut file, data).await {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }

            return Ok(name);
        }

        Err(StorageError::NameCollision {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    async fn get_stream(&self, name: &str) -> Result<SizedReader, StorageError> {
        let (file, len) = self.open_file(name).await?;
        Ok((Box::new(BufReader::new(file)), len))
    }
}

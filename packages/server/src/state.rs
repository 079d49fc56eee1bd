use std::sync::Arc;

use snapmap_common::storage::BlobStore;
use snapmap_common::storage::filesystem::FilesystemBlobStore;
use snapmap_common::{LedgerError, MetadataLedger};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub blob_store: Arc<dyn BlobStore>,
    pub ledger: Arc<MetadataLedger>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the stores named by `config`. The upload directory itself is
    /// created on the first stored image.
    pub async fn init(config: AppConfig) -> Result<Self, LedgerError> {
        let ledger = MetadataLedger::open(&config.storage.ledger_path).await?;
        let blob_store = FilesystemBlobStore::new(
            config.storage.upload_dir.clone(),
            config.upload.max_file_size,
        );

        Ok(Self {
            blob_store: Arc::new(blob_store),
            ledger: Arc::new(ledger),
            config,
        })
    }
}

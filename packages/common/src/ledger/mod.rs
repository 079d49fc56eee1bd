//! Append-only metadata ledger.
//!
//! Records are held in memory behind a single mutex and checkpointed to a
//! JSON array file on every append. A checkpoint writes a sibling `.tmp`
//! file, syncs it, and renames it over the ledger, so a crash leaves either
//! the previous or the new array on disk, never a torn one.

mod error;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::record::MetadataRecord;

pub use error::LedgerError;

pub struct MetadataLedger {
    path: PathBuf,
    records: Mutex<Vec<MetadataRecord>>,
}

impl MetadataLedger {
    /// Open the ledger at `path`, loading any records already on disk.
    ///
    /// A missing file is an empty ledger; nothing is written until the first
    /// append.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let records = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| LedgerError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), records = records.len(), "Metadata ledger opened");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and checkpoint.
    ///
    /// If the checkpoint fails the record is dropped again, so memory never
    /// runs ahead of disk.
    pub async fn append(&self, record: MetadataRecord) -> Result<(), LedgerError> {
        let mut records = self.records.lock().await;
        records.push(record);
        if let Err(e) = checkpoint(&self.path, &records).await {
            records.pop();
            return Err(e);
        }
        debug!(records = records.len(), "Ledger checkpointed");
        Ok(())
    }

    /// Every record in insertion order.
    pub async fn list_all(&self) -> Vec<MetadataRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Write the current sequence to disk. Called on shutdown.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        let records = self.records.lock().await;
        if records.is_empty() && !fs::try_exists(&self.path).await? {
            return Ok(());
        }
        checkpoint(&self.path, &records).await
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn checkpoint(path: &Path, records: &[MetadataRecord]) -> Result<(), LedgerError> {
    let encoded = serde_json::to_vec_pretty(records).map_err(LedgerError::Encode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    let result = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(&encoded).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

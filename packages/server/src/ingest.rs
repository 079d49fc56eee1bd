//! Upload ingestion: validate, store, record.
//!
//! Nothing touches the blob store or the ledger until the location fields,
//! the file count, and every file's extension and size have been checked, so
//! a rejected request leaves no trace. Once storing starts, each photo is
//! written and then recorded before the next one. A storage failure midway
//! keeps the pairs already written; they are complete and listed, and the
//! client gets an error for the request as a whole.

use std::path::Path;

use axum::body::Bytes;
use chrono::Utc;
use snapmap_common::storage::BlobStore;
use snapmap_common::{MetadataLedger, MetadataRecord};
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::models::image::UploadResponse;

/// Text fields of an upload form, as received.
#[derive(Debug, Default, Clone)]
pub struct UploadFields {
    pub town: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// One `photos` part of an upload form.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub original_name: String,
    pub content: Bytes,
}

impl UploadedPhoto {
    pub fn new(original_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            original_name: original_name.into(),
            content: content.into(),
        }
    }
}

struct Location {
    town: String,
    lat: String,
    lon: String,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UploadFields {
    fn validate(self) -> Result<Location, AppError> {
        match (required(self.town), required(self.lat), required(self.lon)) {
            (Some(town), Some(lat), Some(lon)) => Ok(Location { town, lat, lon }),
            _ => Err(AppError::missing_data()),
        }
    }
}

/// Return the extension of `original_name` if it is on the allow-list.
///
/// The extension is returned as the client wrote it; only the comparison is
/// case-insensitive.
pub fn accepted_extension<'a>(
    policy: &UploadConfig,
    original_name: &'a str,
) -> Result<&'a str, AppError> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    if !ext.is_empty()
        && policy
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    {
        Ok(ext)
    } else {
        Err(AppError::UnsupportedFile(format!(
            "Only images are allowed ({}): '{}'",
            policy.allowed_extensions.join(", "),
            original_name
        )))
    }
}

/// Reject `size` if it exceeds the per-file limit.
pub fn check_size(policy: &UploadConfig, original_name: &str, size: u64) -> Result<(), AppError> {
    if size > policy.max_file_size {
        return Err(AppError::UnsupportedFile(format!(
            "File '{}' exceeds maximum size of {} bytes",
            original_name, policy.max_file_size
        )));
    }
    Ok(())
}

/// Run the whole ingestion pipeline for one request.
pub async fn ingest(
    blob_store: &dyn BlobStore,
    ledger: &MetadataLedger,
    policy: &UploadConfig,
    fields: UploadFields,
    photos: Vec<UploadedPhoto>,
) -> Result<UploadResponse, AppError> {
    let location = fields.validate()?;
    if photos.is_empty() {
        return Err(AppError::missing_data());
    }
    if photos.len() > policy.max_files {
        return Err(AppError::Validation(format!(
            "Too many files: at most {} photos per upload",
            policy.max_files
        )));
    }

    let mut accepted = Vec::with_capacity(photos.len());
    for photo in &photos {
        let ext = accepted_extension(policy, &photo.original_name)?;
        check_size(policy, &photo.original_name, photo.content.len() as u64)?;
        accepted.push((photo, ext));
    }

    let mut files = Vec::with_capacity(accepted.len());
    for (photo, ext) in accepted {
        let name = blob_store.put(&photo.content, ext).await?;
        debug!(name = %name, size = photo.content.len(), "Blob stored");

        ledger
            .append(MetadataRecord {
                filename: name.to_string(),
                original_name: photo.original_name.clone(),
                town: location.town.clone(),
                lat: location.lat.clone(),
                lon: location.lon.clone(),
                uploaded_at: Utc::now(),
            })
            .await?;

        files.push(name.into());
    }

    info!(town = %location.town, count = files.len(), "Upload ingested");

    Ok(UploadResponse {
        success: true,
        files,
    })
}

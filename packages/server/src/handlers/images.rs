use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use snapmap_common::MetadataRecord;
use snapmap_common::storage::StorageError;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::config::UploadConfig;
use crate::error::{AppError, ErrorBody};
use crate::ingest::{self, UploadFields, UploadedPhoto};
use crate::models::image::UploadResponse;
use crate::state::AppState;

/// Headroom for the text fields and multipart framing.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn upload_body_limit(policy: &UploadConfig) -> DefaultBodyLimit {
    let files = usize::try_from(policy.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_mul(policy.max_files);
    DefaultBodyLimit::max(files.saturating_add(FORM_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Images",
    operation_id = "uploadImages",
    summary = "Upload geotagged images",
    description = "Accepts `town`, `lat` and `lon` text fields and up to 10 `photos` file parts. \
        Only jpeg, jpg, png, gif and webp files up to 15 MiB are accepted; one rejected file \
        rejects the whole upload and nothing is stored.",
    request_body(content_type = "multipart/form-data", description = "Location fields and photos"),
    responses(
        (status = 200, description = "Images stored", body = UploadResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR) or rejected file (UNSUPPORTED_FILE)", body = ErrorBody),
        (status = 500, description = "Storage failure (STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let policy = &state.config.upload;
    let mut fields = UploadFields::default();
    let mut photos: Vec<UploadedPhoto> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, policy.max_file_size))?
    {
        match field.name() {
            Some("photos") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                // Bodies that ingestion is bound to reject are not buffered.
                let content = if photos.len() < policy.max_files
                    && ingest::accepted_extension(policy, &original_name).is_ok()
                {
                    read_bounded(field, policy.max_file_size).await?
                } else {
                    Bytes::new()
                };
                photos.push(UploadedPhoto {
                    original_name,
                    content,
                });
            }
            Some("town") => fields.town = Some(read_text(field).await?),
            Some("lat") => fields.lat = Some(read_text(field).await?),
            Some("lon") => fields.lon = Some(read_text(field).await?),
            _ => {} // Ignore unknown fields.
        }
    }

    let response = ingest::ingest(
        &*state.blob_store,
        &state.ledger,
        policy,
        fields,
        photos,
    )
    .await?;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    operation_id = "listImages",
    summary = "List image metadata",
    description = "Returns every metadata record in upload order.",
    responses(
        (status = 200, description = "All records", body = Vec<MetadataRecord>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_images(State(state): State<AppState>) -> Json<Vec<MetadataRecord>> {
    Json(state.ledger.list_all().await)
}

#[utoipa::path(
    get,
    path = "/image/{filename}",
    tag = "Images",
    operation_id = "fetchImage",
    summary = "Download an image",
    description = "Streams the raw bytes of a stored image. The content type is derived from the \
        file extension.",
    params(("filename" = String, Path, description = "Generated filename returned by upload")),
    responses(
        (status = 200, description = "Image content"),
        (status = 404, description = "Not found", body = String, content_type = "text/plain"),
    ),
)]
#[instrument(skip(state))]
pub async fn fetch_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (reader, size) = state
        .blob_store
        .get_stream(&filename)
        .await
        .map_err(not_found_on_bad_name)?;

    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        // Names are never reused, so the bytes behind one never change.
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// An unsafe name in the URL is reported exactly like a missing image.
fn not_found_on_bad_name(err: StorageError) -> AppError {
    match err {
        StorageError::InvalidName(reason) => AppError::NotFound(reason),
        other => other.into(),
    }
}

/// Past the body limit the only thing still streaming is file content, so
/// hitting it means a file is over the per-file limit.
fn multipart_error(err: MultipartError, max_file_size: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UnsupportedFile(format!("File exceeds maximum size of {max_file_size} bytes"))
    } else {
        AppError::Validation(format!("Multipart error: {err}"))
    }
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))
}

/// Buffer a file part, stopping one chunk past `max_size`.
///
/// Anything longer than `max_size` comes back truncated but still over the
/// limit, so ingestion rejects it without the whole body sitting in memory.
async fn read_bounded(mut field: Field<'_>, max_size: u64) -> Result<Bytes, AppError> {
    let mut buf = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        buf.extend_from_slice(&chunk);
        if buf.len() as u64 > max_size {
            break;
        }
    }

    Ok(Bytes::from(buf))
}

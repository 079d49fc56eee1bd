use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata for one stored image.
///
/// `filename` is the blob store key; every other field is opaque to storage.
/// Ledgers written before the camelCase rename used `originalname` and
/// `uploaded`, both of which are still accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Generated blob name, usable with `GET /image/{filename}`.
    #[schema(example = "1718000000000-482913377.png")]
    pub filename: String,
    /// Name of the file as sent by the client.
    #[serde(alias = "originalname")]
    #[schema(example = "IMG_0042.png")]
    pub original_name: String,
    #[schema(example = "Springfield")]
    pub town: String,
    /// Latitude exactly as submitted.
    #[schema(example = "44.0")]
    pub lat: String,
    /// Longitude exactly as submitted.
    #[schema(example = "-72.5")]
    pub lon: String,
    /// Assigned by the server once the blob is stored.
    #[serde(alias = "uploaded")]
    pub uploaded_at: DateTime<Utc>,
}

use serde::Serialize;

/// Response DTO for a successful upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = true)]
    pub success: bool,
    /// Generated names, one per uploaded photo, in upload order.
    #[schema(example = json!(["1718000000000-482913377.png"]))]
    pub files: Vec<String>,
}

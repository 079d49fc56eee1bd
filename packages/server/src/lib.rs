pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SnapMap API",
        version = "1.0.0",
        description = "Upload, list and download location-tagged images"
    ),
    paths(
        handlers::images::upload_images,
        handlers::images::list_images,
        handlers::images::fetch_image,
    ),
    components(schemas(
        snapmap_common::MetadataRecord,
        models::image::UploadResponse,
        error::ErrorBody,
    )),
    tags(
        (name = "Images", description = "Image ingestion and retrieval"),
    ),
)]
struct ApiDoc;

/// Build the CORS layer. An origin of `"*"` allows any origin.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(cors.max_age));

    if cors.allow_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    routes::routes(&state.config.upload)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
}

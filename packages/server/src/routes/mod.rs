use axum::{Router, routing::get, routing::post};

use crate::config::UploadConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(upload: &UploadConfig) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(handlers::images::upload_images)
                .layer(handlers::images::upload_body_limit(upload)),
        )
        .route("/images", get(handlers::images::list_images))
        .route("/image/{filename}", get(handlers::images::fetch_image))
}

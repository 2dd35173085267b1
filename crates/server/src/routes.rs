//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/files", get(handlers::search_files))
        // Static segments take precedence over `{backend}`.
        .route("/api/files/bulk-delete", post(handlers::bulk_delete))
        .route("/api/files/merge", post(handlers::merge_files))
        .route("/api/files/{backend}", post(handlers::upload_file))
        .route(
            "/api/files/{backend}/{id}",
            get(handlers::get_file)
                .patch(handlers::rename_file)
                .delete(handlers::delete_file),
        )
        .route(
            "/api/files/{backend}/{id}/content",
            get(handlers::get_file_content),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

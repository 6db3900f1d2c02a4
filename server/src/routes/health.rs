//! Health check endpoint.

use axum::{routing::get, Json, Router};
use catalog_sync_engine::{TableVersion, FIELD_TABLE_VERSION};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Version of the CMS field table the mapper writes
    pub field_table_version: TableVersion,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        field_table_version: FIELD_TABLE_VERSION,
    })
}

async fn root() -> &'static str {
    "Catalog Sync Server"
}

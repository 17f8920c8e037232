use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    external_tariff_source: bool,
}

/// GET /healthz
#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/api/v1/healthz",
    responses((status = 200, description = "Service is up", body = HealthResponse))
))]
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        external_tariff_source: state.resolver.external_configured(),
    };
    (StatusCode::OK, Json(response))
}

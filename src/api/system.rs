//! System API endpoints.

use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SystemStatus};

/// Returns system status.
///
/// # Endpoint
/// `GET /api/system/status`
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let query_count = state
        .store()
        .query_count()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to count queries: {e}")))?;

    let place_count = state
        .store()
        .total_place_count()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to count places: {e}")))?;

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        query_count,
        place_count,
    })))
}

/// Liveness probe, no auth.
///
/// # Endpoint
/// `GET /api/system/health`
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<bool>> {
    let database_ok = state.store().ping().await.is_ok();
    Json(ApiResponse::success(database_ok))
}

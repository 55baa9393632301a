use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_max_details, validate_query_id, validate_search_term};
use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{
    PlaceDto, QueryResultDto, QuerySummaryDto, RefreshRequest, SearchRequest,
};
use crate::domain::QueryId;

/// POST /api/places/search
///
/// Resolve a (city, category) pair against the cache, hitting the remote
/// directory only for queries this owner has never searched before.
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<ApiResponse<QueryResultDto>>, ApiError> {
    let city = validate_search_term("City", &payload.city)?;
    let category = validate_search_term("Category", &payload.category)?;
    let max_details = validate_max_details(payload.max_details)?;

    let result = state
        .place_service()
        .search(current.id, city, category, max_details)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/places/refresh
///
/// Re-run the text search and/or fill detail gaps for an existing query.
pub async fn refresh_query(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<QueryResultDto>>, ApiError> {
    validate_query_id(payload.query_id.value())?;
    let max_details = validate_max_details(payload.max_details)?;

    let result = state
        .place_service()
        .refresh(
            current.id,
            payload.query_id,
            payload.refresh_text_search,
            payload.refresh_details,
            max_details,
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/places/queries
pub async fn list_queries(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<QuerySummaryDto>>>, ApiError> {
    let queries = state.place_service().list_queries(current.id).await?;
    Ok(Json(ApiResponse::success(queries)))
}

/// GET /api/places/queries/{id}
pub async fn get_query(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<QueryResultDto>>, ApiError> {
    let id = validate_query_id(id)?;
    let result = state
        .place_service()
        .get_query(current.id, QueryId::new(id))
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/places/queries/{id}/places
pub async fn list_places(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<PlaceDto>>>, ApiError> {
    let id = validate_query_id(id)?;
    let places = state
        .place_service()
        .list_places(current.id, QueryId::new(id))
        .await?;
    Ok(Json(ApiResponse::success(places)))
}

use serde::{Deserialize, Serialize};

use crate::domain::QueryId;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub city: String,
    pub category: String,
    /// Detail-call budget for this round; omitted means no detail calls.
    pub max_details: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub query_id: QueryId,
    #[serde(default)]
    pub refresh_text_search: bool,
    #[serde(default)]
    pub refresh_details: bool,
    pub max_details: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct QueryResultDto {
    pub id: QueryId,
    pub city: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
    pub places: Vec<PlaceDto>,
    pub outcome: SyncOutcomeDto,
}

#[derive(Debug, Serialize)]
pub struct QuerySummaryDto {
    pub id: QueryId,
    pub city: String,
    pub category: String,
    pub place_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// What the round cost and what went wrong, for retry decisions.
#[derive(Debug, Serialize)]
pub struct SyncOutcomeDto {
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_search_error: Option<String>,
    pub detail_calls: usize,
    pub detail_failures: usize,
    pub failed_external_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceDto {
    pub id: i32,
    pub external_id: String,
    pub search_query_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub formatted_address: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub phone_number: Option<String>,
    pub international_phone_number: Option<String>,
    pub website: Option<String>,
    pub business_status: Option<String>,
    pub types: Option<String>,
    pub opening_hours: Option<String>,
    pub price_level: Option<i32>,
    pub has_details: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub query_count: u64,
    pub place_count: u64,
}

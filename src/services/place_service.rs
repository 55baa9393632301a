//! Domain service for the search/refresh reconciliation engine.
//!
//! This is the seam between the HTTP layer and the store/directory: the
//! trait keeps handlers free of persistence concerns and lets tests drive
//! the engine with a scripted directory.

use crate::api::types::{PlaceDto, QueryResultDto, QuerySummaryDto, SyncOutcomeDto};
use crate::domain::{QueryId, UserId};
use crate::entities::{places, search_queries};
use thiserror::Error;

/// Domain errors for place operations.
#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("Search query not found: {0}")]
    NotFound(QueryId),

    #[error("Invalid search input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for PlaceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// What a search or refresh round actually did, reported alongside the
/// result set so callers can make retry decisions. Individual detail
/// failures are metadata here, never a hard error.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Result set was served entirely from the store, zero remote calls.
    pub from_cache: bool,

    /// Text search was attempted and failed; the query row is still
    /// persisted so the next attempt is not re-paid transparently.
    pub text_search_error: Option<String>,

    /// Detail lookups issued this round (bounded by the budget).
    pub detail_calls: usize,

    /// External ids whose detail lookup failed; they stay undetailed and
    /// are natural candidates for the next refresh.
    pub failed_external_ids: Vec<String>,
}

impl SyncOutcome {
    #[must_use]
    pub const fn cache_hit() -> Self {
        Self {
            from_cache: true,
            text_search_error: None,
            detail_calls: 0,
            failed_external_ids: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait PlaceService: Send + Sync {
    /// Resolve a (city, category) search for the owner: cache hit, or
    /// create-and-fetch with optional detail enrichment.
    ///
    /// # Errors
    ///
    /// - [`PlaceError::Validation`] if city or category is empty after
    ///   normalization; rejected before any store write or remote call
    /// - [`PlaceError::Database`] on store failures
    ///
    /// A failed text search is not an error: the query is persisted and
    /// the failure is surfaced in the result's outcome metadata.
    async fn search(
        &self,
        owner: UserId,
        city: &str,
        category: &str,
        max_details: Option<i64>,
    ) -> Result<QueryResultDto, PlaceError>;

    /// Re-run the text search and/or fill detail gaps for an existing
    /// query. With both flags off this performs no remote calls and
    /// returns current state.
    ///
    /// # Errors
    ///
    /// - [`PlaceError::NotFound`] if the query does not exist or is not
    ///   owned by the caller
    /// - [`PlaceError::Database`] on store failures
    async fn refresh(
        &self,
        owner: UserId,
        id: QueryId,
        refresh_text_search: bool,
        refresh_details: bool,
        max_details: Option<i64>,
    ) -> Result<QueryResultDto, PlaceError>;

    /// Current state of one query, no remote calls.
    async fn get_query(&self, owner: UserId, id: QueryId) -> Result<QueryResultDto, PlaceError>;

    /// All queries owned by the caller, most recently updated first.
    async fn list_queries(&self, owner: UserId) -> Result<Vec<QuerySummaryDto>, PlaceError>;

    /// Places for one query, no remote calls.
    async fn list_places(&self, owner: UserId, id: QueryId) -> Result<Vec<PlaceDto>, PlaceError>;
}

/// Trim and case-fold one side of the cache key.
#[must_use]
pub fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[must_use]
pub fn place_to_dto(model: places::Model) -> PlaceDto {
    PlaceDto {
        id: model.id,
        external_id: model.external_id,
        search_query_id: model.search_query_id,
        name: model.name,
        address: model.address,
        formatted_address: model.formatted_address,
        city: model.city,
        category: model.category,
        latitude: model.latitude,
        longitude: model.longitude,
        rating: model.rating,
        user_ratings_total: model.user_ratings_total,
        phone_number: model.phone_number,
        international_phone_number: model.international_phone_number,
        website: model.website,
        business_status: model.business_status,
        types: model.types,
        opening_hours: model.opening_hours,
        price_level: model.price_level,
        has_details: model.has_details,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[must_use]
pub fn query_to_dto(
    model: search_queries::Model,
    place_rows: Vec<places::Model>,
    outcome: SyncOutcome,
) -> QueryResultDto {
    QueryResultDto {
        id: QueryId::new(model.id),
        city: model.city,
        category: model.category,
        created_at: model.created_at,
        updated_at: model.updated_at,
        places: place_rows.into_iter().map(place_to_dto).collect(),
        outcome: SyncOutcomeDto {
            from_cache: outcome.from_cache,
            text_search_error: outcome.text_search_error,
            detail_calls: outcome.detail_calls,
            detail_failures: outcome.failed_external_ids.len(),
            failed_external_ids: outcome.failed_external_ids,
        },
    }
}

#[must_use]
pub fn query_to_summary_dto(model: search_queries::Model, place_count: u64) -> QuerySummaryDto {
    QuerySummaryDto {
        id: QueryId::new(model.id),
        city: model.city,
        category: model.category,
        place_count,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_term("  Austin "), "austin");
        assert_eq!(normalize_term("BAKERIES"), "bakeries");
        assert_eq!(normalize_term("   "), "");
    }

    #[test]
    fn cache_hit_outcome_reports_no_calls() {
        let outcome = SyncOutcome::cache_hit();
        assert!(outcome.from_cache);
        assert_eq!(outcome.detail_calls, 0);
        assert!(outcome.failed_external_ids.is_empty());
    }

    #[test]
    fn db_error_converts_to_place_error() {
        let db_err = sea_orm::DbErr::Custom("test".to_string());
        let err: PlaceError = db_err.into();
        assert!(matches!(err, PlaceError::Database(_)));
    }
}

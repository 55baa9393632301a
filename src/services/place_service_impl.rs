//! `SeaORM` implementation of [`PlaceService`] — the reconciliation engine.
//!
//! Decides, per (owner, city, category) scope, whether to serve cached
//! rows, fetch a fresh listing, and/or selectively re-fetch per-place
//! detail data under an explicit call budget. The store is the single
//! source of truth; there is no in-memory cache to go stale.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::api::types::{PlaceDto, QueryResultDto, QuerySummaryDto};
use crate::clients::{PlacesDirectory, RawDetails, RawPlace};
use crate::db::{PlaceDetailPatch, PlaceListing, Store};
use crate::domain::{QueryId, UserId};
use crate::entities::{places, search_queries};
use crate::services::place_service::{
    PlaceError, PlaceService, SyncOutcome, normalize_term, place_to_dto, query_to_dto,
    query_to_summary_dto,
};
use crate::services::quota;

/// Outcome of one detail-enrichment round.
struct EnrichmentOutcome {
    attempted: usize,
    failed_external_ids: Vec<String>,
}

pub struct SeaOrmPlaceService {
    store: Store,
    directory: Arc<dyn PlacesDirectory>,
    /// Upper bound on in-flight detail lookups; respects the directory's
    /// rate limits without serializing the whole batch.
    max_concurrent_details: usize,
}

impl SeaOrmPlaceService {
    #[must_use]
    pub fn new(
        store: Store,
        directory: Arc<dyn PlacesDirectory>,
        max_concurrent_details: usize,
    ) -> Self {
        Self {
            store,
            directory,
            max_concurrent_details: max_concurrent_details.max(1),
        }
    }

    /// Ingest a text-search result page under a query.
    ///
    /// Upserts run one at a time so the autoincrement id order of fresh
    /// rows matches the directory's result order — enrichment selection
    /// depends on that.
    async fn ingest_listing(
        &self,
        query: &search_queries::Model,
        raw_places: Vec<RawPlace>,
    ) -> Result<usize, PlaceError> {
        let count = raw_places.len();

        for raw in raw_places {
            let listing = listing_from_raw(raw, &query.city, &query.category);
            self.store
                .upsert_place_listing(query.id, &listing)
                .await
                .map_err(|e| PlaceError::Database(e.to_string()))?;
        }

        Ok(count)
    }

    /// Fetch and merge details for up to `budget` of `candidates`.
    ///
    /// Lookups run concurrently up to the configured bound; merges are
    /// applied one place at a time as single atomic updates. One failed
    /// lookup never aborts the batch — only a store write failure does.
    async fn enrich_details(
        &self,
        candidates: Vec<places::Model>,
        budget: Option<i64>,
    ) -> Result<EnrichmentOutcome, PlaceError> {
        let selected = quota::allocate(candidates, budget);
        let attempted = selected.len();

        let fetches = selected.into_iter().map(|place| {
            let directory = Arc::clone(&self.directory);
            async move {
                let result = directory.get_details(&place.external_id).await;
                (place.external_id, result)
            }
        });

        let results: Vec<(String, anyhow::Result<RawDetails>)> = futures::stream::iter(fetches)
            .buffer_unordered(self.max_concurrent_details)
            .collect()
            .await;

        let mut failed_external_ids = Vec::new();

        for (external_id, result) in results {
            match result {
                Ok(details) => {
                    let patch = patch_from_raw(details);
                    self.store
                        .apply_place_details(&external_id, &patch)
                        .await
                        .map_err(|e| PlaceError::Database(e.to_string()))?;
                }
                Err(err) => {
                    warn!(external_id, "Detail fetch failed: {err:#}");
                    failed_external_ids.push(external_id);
                }
            }
        }

        Ok(EnrichmentOutcome {
            attempted,
            failed_external_ids,
        })
    }

    async fn load_result(
        &self,
        query: search_queries::Model,
        outcome: SyncOutcome,
    ) -> Result<QueryResultDto, PlaceError> {
        let place_rows = self
            .store
            .list_places(query.id)
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?;

        Ok(query_to_dto(query, place_rows, outcome))
    }

    async fn reload_query(
        &self,
        id: i32,
        owner: UserId,
    ) -> Result<search_queries::Model, PlaceError> {
        self.store
            .get_query(id, owner.value())
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?
            .ok_or(PlaceError::NotFound(QueryId::new(id)))
    }
}

#[async_trait::async_trait]
impl PlaceService for SeaOrmPlaceService {
    async fn search(
        &self,
        owner: UserId,
        city: &str,
        category: &str,
        max_details: Option<i64>,
    ) -> Result<QueryResultDto, PlaceError> {
        let city = normalize_term(city);
        let category = normalize_term(category);

        if city.is_empty() {
            return Err(PlaceError::Validation("City cannot be empty".to_string()));
        }
        if category.is_empty() {
            return Err(PlaceError::Validation(
                "Category cannot be empty".to_string(),
            ));
        }

        let (query, created) = self
            .store
            .find_or_create_query(owner.value(), &city, &category)
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?;

        if !created {
            // Pure cache hit: zero external calls, zero cost.
            info!(query_id = query.id, %city, %category, "Search served from cache");
            return self.load_result(query, SyncOutcome::cache_hit()).await;
        }

        info!(query_id = query.id, %city, %category, "New search scope, fetching listing");

        let mut outcome = SyncOutcome::default();

        match self.directory.text_search(&city, &category).await {
            Ok(raw_places) => {
                let ingested = self.ingest_listing(&query, raw_places).await?;
                info!(query_id = query.id, ingested, "Listing ingested");

                let candidates = self
                    .store
                    .list_undetailed_places(query.id)
                    .await
                    .map_err(|e| PlaceError::Database(e.to_string()))?;

                let enrichment = self.enrich_details(candidates, max_details).await?;
                outcome.detail_calls = enrichment.attempted;
                outcome.failed_external_ids = enrichment.failed_external_ids;

                if ingested > 0 {
                    self.store
                        .touch_query(query.id)
                        .await
                        .map_err(|e| PlaceError::Database(e.to_string()))?;
                }
            }
            Err(err) => {
                // The query row stays persisted so the caller is not
                // silently re-billed for a retry; the failure travels in
                // the outcome metadata.
                warn!(query_id = query.id, "Text search failed: {err:#}");
                outcome.text_search_error = Some(err.to_string());
            }
        }

        let query = self.reload_query(query.id, owner).await?;
        self.load_result(query, outcome).await
    }

    async fn refresh(
        &self,
        owner: UserId,
        id: QueryId,
        refresh_text_search: bool,
        refresh_details: bool,
        max_details: Option<i64>,
    ) -> Result<QueryResultDto, PlaceError> {
        let query = self
            .store
            .get_query(id.value(), owner.value())
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?
            .ok_or(PlaceError::NotFound(id))?;

        let mut outcome = SyncOutcome::default();
        let mut mutated = false;

        if refresh_text_search {
            match self.directory.text_search(&query.city, &query.category).await {
                Ok(raw_places) => {
                    // Merge, never delete: the directory's result set is
                    // neither exhaustive nor stable, so rows absent from
                    // this page are retained as-is.
                    let ingested = self.ingest_listing(&query, raw_places).await?;
                    info!(query_id = query.id, ingested, "Listing refreshed");
                    mutated = ingested > 0;
                }
                Err(err) => {
                    warn!(query_id = query.id, "Text search refresh failed: {err:#}");
                    outcome.text_search_error = Some(err.to_string());
                }
            }
        }

        if refresh_details {
            // Refresh targets gaps: only undetailed places are candidates,
            // and a surplus budget is never spent re-verifying detailed
            // ones.
            let candidates = self
                .store
                .list_undetailed_places(query.id)
                .await
                .map_err(|e| PlaceError::Database(e.to_string()))?;

            let enrichment = self.enrich_details(candidates, max_details).await?;
            mutated |= enrichment.attempted > enrichment.failed_external_ids.len();
            outcome.detail_calls = enrichment.attempted;
            outcome.failed_external_ids = enrichment.failed_external_ids;
        }

        if mutated {
            self.store
                .touch_query(query.id)
                .await
                .map_err(|e| PlaceError::Database(e.to_string()))?;
        }

        let query = self.reload_query(query.id, owner).await?;
        self.load_result(query, outcome).await
    }

    async fn get_query(&self, owner: UserId, id: QueryId) -> Result<QueryResultDto, PlaceError> {
        let query = self
            .store
            .get_query(id.value(), owner.value())
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?
            .ok_or(PlaceError::NotFound(id))?;

        self.load_result(query, SyncOutcome::cache_hit()).await
    }

    async fn list_queries(&self, owner: UserId) -> Result<Vec<QuerySummaryDto>, PlaceError> {
        let queries = self
            .store
            .list_queries(owner.value())
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?;

        let mut summaries = Vec::with_capacity(queries.len());
        for query in queries {
            let place_count = self
                .store
                .place_count(query.id)
                .await
                .map_err(|e| PlaceError::Database(e.to_string()))?;
            summaries.push(query_to_summary_dto(query, place_count));
        }

        Ok(summaries)
    }

    async fn list_places(&self, owner: UserId, id: QueryId) -> Result<Vec<PlaceDto>, PlaceError> {
        let query = self
            .store
            .get_query(id.value(), owner.value())
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?
            .ok_or(PlaceError::NotFound(id))?;

        let place_rows = self
            .store
            .list_places(query.id)
            .await
            .map_err(|e| PlaceError::Database(e.to_string()))?;

        Ok(place_rows.into_iter().map(place_to_dto).collect())
    }
}

/// Shape a text-search result into the listing columns.
fn listing_from_raw(raw: RawPlace, city: &str, category: &str) -> PlaceListing {
    let location = raw.geometry.and_then(|g| g.location);

    PlaceListing {
        external_id: raw.place_id,
        name: raw.name.unwrap_or_default(),
        address: raw.formatted_address,
        city: Some(city.to_string()),
        category: Some(category.to_string()),
        latitude: location.as_ref().and_then(|l| l.lat),
        longitude: location.as_ref().and_then(|l| l.lng),
        rating: raw.rating,
        user_ratings_total: raw.user_ratings_total,
        business_status: raw.business_status,
        types: raw.types.as_ref().and_then(|t| serde_json::to_string(t).ok()),
    }
}

/// Shape a details result into the extended columns. The JSON-bearing
/// fields are copied through without interpreting their structure.
fn patch_from_raw(raw: RawDetails) -> PlaceDetailPatch {
    let location = raw.geometry.and_then(|g| g.location);

    PlaceDetailPatch {
        formatted_address: raw.formatted_address,
        latitude: location.as_ref().and_then(|l| l.lat),
        longitude: location.as_ref().and_then(|l| l.lng),
        rating: raw.rating,
        user_ratings_total: raw.user_ratings_total,
        phone_number: raw.formatted_phone_number,
        international_phone_number: raw.international_phone_number,
        website: raw.website,
        business_status: raw.business_status,
        types: raw.types.as_ref().and_then(|t| serde_json::to_string(t).ok()),
        opening_hours: raw
            .opening_hours
            .and_then(|h| h.weekday_text)
            .as_ref()
            .and_then(|t| serde_json::to_string(t).ok()),
        price_level: raw.price_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::google_places::{Geometry, Location};

    fn raw_place(id: &str) -> RawPlace {
        RawPlace {
            place_id: id.to_string(),
            name: Some("Corner Bakery".to_string()),
            formatted_address: Some("1 Main St".to_string()),
            geometry: Some(Geometry {
                location: Some(Location {
                    lat: Some(30.1),
                    lng: Some(-97.7),
                }),
            }),
            rating: Some(4.2),
            user_ratings_total: Some(50),
            business_status: Some("OPERATIONAL".to_string()),
            types: Some(vec!["bakery".to_string()]),
        }
    }

    #[test]
    fn listing_from_raw_carries_query_scope() {
        let listing = listing_from_raw(raw_place("xyz"), "austin", "bakeries");
        assert_eq!(listing.external_id, "xyz");
        assert_eq!(listing.city.as_deref(), Some("austin"));
        assert_eq!(listing.category.as_deref(), Some("bakeries"));
        assert_eq!(listing.latitude, Some(30.1));
        assert_eq!(listing.types.as_deref(), Some(r#"["bakery"]"#));
    }

    #[test]
    fn patch_from_raw_serializes_opaque_blobs() {
        let raw = RawDetails {
            formatted_address: Some("1 Main St, Austin".to_string()),
            opening_hours: Some(crate::clients::google_places::OpeningHours {
                weekday_text: Some(vec!["Monday: 7AM-3PM".to_string()]),
            }),
            ..Default::default()
        };

        let patch = patch_from_raw(raw);
        assert_eq!(patch.formatted_address.as_deref(), Some("1 Main St, Austin"));
        assert_eq!(
            patch.opening_hours.as_deref(),
            Some(r#"["Monday: 7AM-3PM"]"#)
        );
        assert!(patch.website.is_none());
    }
}

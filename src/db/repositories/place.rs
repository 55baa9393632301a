use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{places, prelude::*};

/// Fields a text-search result contributes to a place row.
///
/// Upserting a listing never touches the detail columns or `has_details`;
/// those belong to [`PlaceDetailPatch`].
#[derive(Debug, Clone, Default)]
pub struct PlaceListing {
    pub external_id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub business_status: Option<String>,
    pub types: Option<String>,
}

/// Fields a detail lookup contributes to a place row. Applied as one
/// atomic update together with `has_details = true`.
#[derive(Debug, Clone, Default)]
pub struct PlaceDetailPatch {
    pub formatted_address: Option<String>,
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
}

pub struct PlaceRepository {
    conn: DatabaseConnection,
}

impl PlaceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert or update a place from a text-search result.
    ///
    /// Keyed on the store-wide unique `external_id`. On conflict only the
    /// listing columns are overwritten: `search_query_id` keeps the place
    /// with the query that first discovered it, and `has_details` plus the
    /// detail columns survive the refresh.
    pub async fn upsert_listing(&self, search_query_id: i32, listing: &PlaceListing) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = places::ActiveModel {
            external_id: Set(listing.external_id.clone()),
            search_query_id: Set(search_query_id),
            name: Set(listing.name.clone()),
            address: Set(listing.address.clone()),
            city: Set(listing.city.clone()),
            category: Set(listing.category.clone()),
            latitude: Set(listing.latitude),
            longitude: Set(listing.longitude),
            rating: Set(listing.rating),
            user_ratings_total: Set(listing.user_ratings_total),
            business_status: Set(listing.business_status.clone()),
            types: Set(listing.types.clone()),
            has_details: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Places::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(places::Column::ExternalId)
                    .update_columns([
                        places::Column::Name,
                        places::Column::Address,
                        places::Column::City,
                        places::Column::Category,
                        places::Column::Latitude,
                        places::Column::Longitude,
                        places::Column::Rating,
                        places::Column::UserRatingsTotal,
                        places::Column::BusinessStatus,
                        places::Column::Types,
                        places::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert place listing")?;

        Ok(())
    }

    /// Merge detail fields into a place and mark it detailed, as a single
    /// atomic update. Fields the directory omitted keep their current
    /// values.
    pub async fn apply_details(&self, external_id: &str, patch: &PlaceDetailPatch) -> Result<bool> {
        let Some(place) = Places::find()
            .filter(places::Column::ExternalId.eq(external_id))
            .one(&self.conn)
            .await
            .context("Failed to load place for detail merge")?
        else {
            return Ok(false);
        };

        let mut active: places::ActiveModel = place.into();

        if let Some(v) = &patch.formatted_address {
            active.formatted_address = Set(Some(v.clone()));
        }
        if let Some(v) = patch.latitude {
            active.latitude = Set(Some(v));
        }
        if let Some(v) = patch.longitude {
            active.longitude = Set(Some(v));
        }
        if let Some(v) = patch.rating {
            active.rating = Set(Some(v));
        }
        if let Some(v) = patch.user_ratings_total {
            active.user_ratings_total = Set(Some(v));
        }
        if let Some(v) = &patch.phone_number {
            active.phone_number = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.international_phone_number {
            active.international_phone_number = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.website {
            active.website = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.business_status {
            active.business_status = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.types {
            active.types = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.opening_hours {
            active.opening_hours = Set(Some(v.clone()));
        }
        if let Some(v) = patch.price_level {
            active.price_level = Set(Some(v));
        }
        active.has_details = Set(true);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to apply place details")?;

        Ok(true)
    }

    /// All places for a query in insertion order, which for a fresh search
    /// is the directory's result order.
    pub async fn list_for_query(&self, search_query_id: i32) -> Result<Vec<places::Model>> {
        let rows = Places::find()
            .filter(places::Column::SearchQueryId.eq(search_query_id))
            .order_by_asc(places::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list places for query")?;

        Ok(rows)
    }

    /// Places still awaiting a detail fetch, in insertion order.
    pub async fn undetailed_for_query(&self, search_query_id: i32) -> Result<Vec<places::Model>> {
        let rows = Places::find()
            .filter(places::Column::SearchQueryId.eq(search_query_id))
            .filter(places::Column::HasDetails.eq(false))
            .order_by_asc(places::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list undetailed places for query")?;

        Ok(rows)
    }

    pub async fn count_for_query(&self, search_query_id: i32) -> Result<u64> {
        let count = Places::find()
            .filter(places::Column::SearchQueryId.eq(search_query_id))
            .count(&self.conn)
            .await
            .context("Failed to count places for query")?;

        Ok(count)
    }

    pub async fn total_count(&self) -> Result<u64> {
        let count = Places::find()
            .count(&self.conn)
            .await
            .context("Failed to count places")?;

        Ok(count)
    }
}

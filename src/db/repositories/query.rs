use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use tracing::debug;

use crate::entities::{prelude::*, search_queries};

pub struct QueryRepository {
    conn: DatabaseConnection,
}

impl QueryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Look up a query by its cache key. Inputs are expected to be
    /// normalized already.
    pub async fn find_by_scope(
        &self,
        user_id: i32,
        city: &str,
        category: &str,
    ) -> Result<Option<search_queries::Model>> {
        let query = SearchQueries::find()
            .filter(search_queries::Column::UserId.eq(user_id))
            .filter(search_queries::Column::City.eq(city))
            .filter(search_queries::Column::Category.eq(category))
            .one(&self.conn)
            .await
            .context("Failed to query search scope")?;

        Ok(query)
    }

    /// Get a query by id, scoped to its owner.
    pub async fn get(&self, id: i32, user_id: i32) -> Result<Option<search_queries::Model>> {
        let query = SearchQueries::find_by_id(id)
            .filter(search_queries::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query search query by id")?;

        Ok(query)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<search_queries::Model>> {
        let queries = SearchQueries::find()
            .filter(search_queries::Column::UserId.eq(user_id))
            .order_by_desc(search_queries::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list search queries")?;

        Ok(queries)
    }

    /// Find an existing query for the scope or create it. Returns the row
    /// and whether this call created it.
    ///
    /// Two concurrent first-searches race on the (user_id, city, category)
    /// unique index; the loser re-reads the winner's row and reports
    /// `created = false` so the caller treats it as a cache hit.
    pub async fn find_or_create(
        &self,
        user_id: i32,
        city: &str,
        category: &str,
    ) -> Result<(search_queries::Model, bool)> {
        if let Some(existing) = self.find_by_scope(user_id, city, category).await? {
            return Ok((existing, false));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let active = search_queries::ActiveModel {
            city: Set(city.to_string()),
            category: Set(category.to_string()),
            user_id: Set(user_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok((model, true)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(
                    user_id,
                    city, category, "Lost create race for search query, re-reading"
                );
                let existing = self
                    .find_by_scope(user_id, city, category)
                    .await?
                    .context("Search query vanished after unique-constraint conflict")?;
                Ok((existing, false))
            }
            Err(err) => Err(err).context("Failed to create search query"),
        }
    }

    /// Bump updated_at after any mutation of the query's result set.
    pub async fn touch(&self, id: i32) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        SearchQueries::update_many()
            .col_expr(
                search_queries::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(search_queries::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to touch search query")?;

        Ok(())
    }
}

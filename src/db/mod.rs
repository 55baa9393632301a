use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{places, search_queries};

pub mod migrator;
pub mod repositories;

pub use repositories::place::{PlaceDetailPatch, PlaceListing};
pub use repositories::user::User;

/// Facade over the SQLite store. Cheap to clone; repositories are created
/// per call on top of the shared connection pool.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn query_repo(&self) -> repositories::query::QueryRepository {
        repositories::query::QueryRepository::new(self.conn.clone())
    }

    fn place_repo(&self) -> repositories::place::PlaceRepository {
        repositories::place::PlaceRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Search Query Methods ==========

    pub async fn find_or_create_query(
        &self,
        user_id: i32,
        city: &str,
        category: &str,
    ) -> Result<(search_queries::Model, bool)> {
        self.query_repo().find_or_create(user_id, city, category).await
    }

    pub async fn get_query(&self, id: i32, user_id: i32) -> Result<Option<search_queries::Model>> {
        self.query_repo().get(id, user_id).await
    }

    pub async fn list_queries(&self, user_id: i32) -> Result<Vec<search_queries::Model>> {
        self.query_repo().list_for_user(user_id).await
    }

    pub async fn touch_query(&self, id: i32) -> Result<()> {
        self.query_repo().touch(id).await
    }

    pub async fn query_count(&self) -> Result<u64> {
        use sea_orm::{EntityTrait, PaginatorTrait};
        let count = crate::entities::prelude::SearchQueries::find()
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    // ========== Place Methods ==========

    pub async fn upsert_place_listing(
        &self,
        search_query_id: i32,
        listing: &PlaceListing,
    ) -> Result<()> {
        self.place_repo().upsert_listing(search_query_id, listing).await
    }

    pub async fn apply_place_details(
        &self,
        external_id: &str,
        patch: &PlaceDetailPatch,
    ) -> Result<bool> {
        self.place_repo().apply_details(external_id, patch).await
    }

    pub async fn list_places(&self, search_query_id: i32) -> Result<Vec<places::Model>> {
        self.place_repo().list_for_query(search_query_id).await
    }

    pub async fn list_undetailed_places(
        &self,
        search_query_id: i32,
    ) -> Result<Vec<places::Model>> {
        self.place_repo().undetailed_for_query(search_query_id).await
    }

    pub async fn place_count(&self, search_query_id: i32) -> Result<u64> {
        self.place_repo().count_for_query(search_query_id).await
    }

    pub async fn total_place_count(&self) -> Result<u64> {
        self.place_repo().total_count().await
    }

    // ========== User Methods ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        new_password: &str,
        config: &crate::config::SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password, config)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn get_user_api_key(&self, username: &str) -> Result<Option<String>> {
        self.user_repo().get_api_key(username).await
    }

    pub async fn regenerate_user_api_key(&self, username: &str) -> Result<String> {
        self.user_repo().regenerate_api_key(username).await
    }
}

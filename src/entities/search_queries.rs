use sea_orm::entity::prelude::*;

/// One cached (city, category) search scope owned by a user.
///
/// Uniqueness of (user_id, city, category) is enforced by an index created
/// in the initial migration; it is the cache key for the whole engine.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "search_queries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized (trimmed, lowercased) city.
    pub city: String,

    /// Normalized (trimmed, lowercased) category.
    pub category: String,

    pub user_id: i32,

    pub created_at: String, // ISO8601, SQLite stores these as text

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::places::Entity")]
    Places,
}

impl Related<super::places::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Places.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

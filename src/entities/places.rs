use sea_orm::entity::prelude::*;

/// One directory entry, keyed store-wide by the directory's own stable id.
///
/// A place stays parented to the query that first discovered it; listing
/// refreshes update fields in place and never duplicate the row. The JSON
/// columns (`types`, `opening_hours`) are opaque payloads copied through
/// from the directory untouched.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "places")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
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

    /// JSON array of directory type tags, stored verbatim.
    #[sea_orm(column_type = "Text", nullable)]
    pub types: Option<String>,

    /// JSON array of weekday opening-hours lines, stored verbatim.
    #[sea_orm(column_type = "Text", nullable)]
    pub opening_hours: Option<String>,

    pub price_level: Option<i32>,

    /// False until a detail fetch has populated the extended columns.
    pub has_details: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::search_queries::Entity",
        from = "Column::SearchQueryId",
        to = "super::search_queries::Column::Id"
    )]
    SearchQueries,
}

impl Related<super::search_queries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchQueries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub use super::places::Entity as Places;
pub use super::search_queries::Entity as SearchQueries;
pub use super::users::Entity as Users;

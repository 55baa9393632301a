pub mod prelude;

pub mod places;
pub mod search_queries;
pub mod users;

pub mod place;
pub mod query;
pub mod user;

pub mod place_service;
pub use place_service::{PlaceError, PlaceService, SyncOutcome};

pub mod place_service_impl;
pub use place_service_impl::SeaOrmPlaceService;

pub mod quota;

pub mod error;
pub mod fetch_state_repository;
pub mod models;
pub mod reading_cache;

pub use error::StoreError;
pub use fetch_state_repository::{FetchStateRecord, FetchStateRepository, FetchStatus};
pub use models::*;
pub use reading_cache::ReadingCache;

pub mod config;
pub mod fetch_error;
pub mod fetcher;
pub mod limits;
pub mod report;
pub mod sensor_directory;
pub mod services;
pub mod store;
pub mod utils;

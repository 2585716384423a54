// Library exports for testing
pub mod api;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;

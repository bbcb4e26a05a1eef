pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repo;
pub mod service;
pub mod store;
pub mod utils;

use std::sync::Arc;

/// Shared state handed to the background jobs and the front-end.
#[derive(Debug, Clone)]
pub struct AppState {
    pub env: config::Config,
    pub repo: Arc<repo::ReferralRepo>,
}

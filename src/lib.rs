//! tokend — API token lifecycle service.
//!
//! Issuance, policy-driven expiry, key rotation and permission-scoped
//! visibility, behind pluggable persistence / permission / directory
//! boundaries.

pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod errors;
pub mod generators;
pub mod jobs;
pub mod manager;
pub mod models;
pub mod perms;
pub mod store;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub manager: manager::TokenManager,
    pub config: config::Config,
}

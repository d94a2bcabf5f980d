//! Background job: reap expired tokens.
//!
//! Correctness never depends on this task — authentication checks the expiry
//! predicate itself — the sweep only keeps the table from accumulating dead
//! rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::store::TokenStore;

/// Spawn the background sweep task. Call this once at startup.
pub fn spawn(store: Arc<dyn TokenStore>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match store.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(rows) => tracing::info!(rows, "purged expired tokens"),
                Err(e) => tracing::error!("expiry sweep failed: {}", e),
            }
        }
    });
}

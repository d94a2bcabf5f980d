pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::Token;

/// Partial update applied atomically to a stored token.
/// Identity-defining fields (intent) and the key are deliberately absent:
/// the key only changes through [`TokenStore::set_key`], intent never changes.
#[derive(Debug, Clone, Default)]
pub struct TokenPatch {
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub user: Option<String>,
}

impl TokenPatch {
    pub fn is_empty(&self) -> bool {
        self.identifier.is_none() && self.description.is_none() && self.user.is_none()
    }
}

/// Durable keyed store for tokens.
///
/// Uniqueness of `identifier` is this boundary's job: `create` (and renames
/// through `update`) must resolve concurrent collisions so exactly one writer
/// wins and the loser sees a validation conflict. Each method is one atomic
/// commit; nothing here requires application-level locks.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomic create-with-uniqueness-check. Duplicate identifiers surface as
    /// `AppError::Validation`, never a silent overwrite.
    async fn create(&self, token: &Token) -> Result<(), AppError>;

    async fn get(&self, identifier: &str) -> Result<Option<Token>, AppError>;

    /// Resolve a presented secret to its token.
    async fn get_by_key(&self, key: &str) -> Result<Option<Token>, AppError>;

    /// Apply a patch in one commit. Returns the updated token, or `None` when
    /// the identifier does not exist. Renaming onto a taken identifier is a
    /// validation conflict.
    async fn update(&self, identifier: &str, patch: &TokenPatch)
        -> Result<Option<Token>, AppError>;

    /// Replace the secret in place. Single atomic write; all other fields are
    /// untouched. Returns false when the token does not exist.
    async fn set_key(&self, identifier: &str, key: &str) -> Result<bool, AppError>;

    async fn delete(&self, identifier: &str) -> Result<bool, AppError>;

    /// All tokens in persisted insertion order.
    async fn list(&self) -> Result<Vec<Token>, AppError>;

    /// Reap rows whose expiry has passed. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

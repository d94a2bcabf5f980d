//! User directory boundary.
//!
//! The token core never owns user accounts; it only reads the per-user
//! token policy attributes. Attribute writes validate the duration string
//! so a malformed `token_maximum_lifetime` is rejected at write time and
//! token creation always sees a parseable (or absent) cap.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::AppError;
use crate::models::UserPolicy;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve the token policy for a user. Unknown users get the default
    /// policy (expiring tokens, no lifetime cap).
    async fn policy(&self, user: &str) -> Result<UserPolicy, AppError>;
}

/// In-process directory keyed by user id. Backs tests and single-node
/// deployments without an external identity store.
#[derive(Default)]
pub struct MemoryDirectory {
    attributes: DashMap<String, serde_json::Value>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a user's attribute object. Fails closed on malformed policy
    /// attributes; nothing is written in that case.
    pub fn set_attributes(
        &self,
        user: &str,
        attrs: serde_json::Value,
    ) -> Result<(), AppError> {
        UserPolicy::from_attributes(&attrs)
            .map_err(|e| AppError::validation(e.to_string()))?;
        self.attributes.insert(user.to_string(), attrs);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn policy(&self, user: &str) -> Result<UserPolicy, AppError> {
        match self.attributes.get(user) {
            Some(attrs) => UserPolicy::from_attributes(&attrs).map_err(AppError::Internal),
            None => Ok(UserPolicy::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_user_gets_default_policy() {
        let dir = MemoryDirectory::new();
        let policy = dir.policy("nobody").await.unwrap();
        assert!(policy.token_expiring);
        assert!(policy.token_maximum_lifetime.is_none());
    }

    #[tokio::test]
    async fn test_malformed_lifetime_rejected_at_write() {
        let dir = MemoryDirectory::new();
        let err = dir
            .set_attributes("alice", json!({ "token_maximum_lifetime": "whenever" }))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // nothing written: policy stays default
        assert!(dir.policy("alice").await.unwrap().token_maximum_lifetime.is_none());
    }
}

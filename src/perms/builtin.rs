//! In-process ACL table. Backs single-node deployments and tests;
//! production deployments can point the oracle at Postgres instead.

use async_trait::async_trait;
use dashmap::DashSet;

use crate::errors::AppError;
use crate::perms::PermissionOracle;

#[derive(Default)]
pub struct AclStore {
    grants: DashSet<(String, String, String)>,
}

impl AclStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionOracle for AclStore {
    async fn grant(&self, actor: &str, permission: &str, object: &str) -> Result<(), AppError> {
        self.grants
            .insert((actor.to_string(), permission.to_string(), object.to_string()));
        Ok(())
    }

    async fn has_permission(
        &self,
        actor: &str,
        permission: &str,
        object: &str,
    ) -> Result<bool, AppError> {
        Ok(self.grants.contains(&(
            actor.to_string(),
            permission.to_string(),
            object.to_string(),
        )))
    }

    async fn revoke_object(&self, object: &str) -> Result<(), AppError> {
        self.grants.retain(|(_, _, obj)| obj != object);
        Ok(())
    }

    async fn rename_object(&self, old: &str, new: &str) -> Result<(), AppError> {
        let moved: Vec<_> = self
            .grants
            .iter()
            .filter(|entry| entry.key().2 == old)
            .map(|entry| entry.key().clone())
            .collect();
        for (actor, permission, _) in moved {
            self.grants.remove(&(actor.clone(), permission.clone(), old.to_string()));
            self.grants.insert((actor, permission, new.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perms::PERM_VIEW_TOKEN_KEY;

    #[tokio::test]
    async fn test_grant_and_check() {
        let acl = AclStore::new();
        acl.grant("alice", PERM_VIEW_TOKEN_KEY, "tok-1").await.unwrap();
        assert!(acl
            .has_permission("alice", PERM_VIEW_TOKEN_KEY, "tok-1")
            .await
            .unwrap());
        assert!(!acl
            .has_permission("bob", PERM_VIEW_TOKEN_KEY, "tok-1")
            .await
            .unwrap());
        assert!(!acl
            .has_permission("alice", PERM_VIEW_TOKEN_KEY, "tok-2")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_revoke_object_drops_all_grants() {
        let acl = AclStore::new();
        acl.grant("alice", PERM_VIEW_TOKEN_KEY, "tok-1").await.unwrap();
        acl.grant("bob", PERM_VIEW_TOKEN_KEY, "tok-1").await.unwrap();
        acl.revoke_object("tok-1").await.unwrap();
        assert!(!acl
            .has_permission("alice", PERM_VIEW_TOKEN_KEY, "tok-1")
            .await
            .unwrap());
        assert!(!acl
            .has_permission("bob", PERM_VIEW_TOKEN_KEY, "tok-1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_rename_object_moves_grants() {
        let acl = AclStore::new();
        acl.grant("alice", PERM_VIEW_TOKEN_KEY, "old").await.unwrap();
        acl.rename_object("old", "new").await.unwrap();
        assert!(!acl
            .has_permission("alice", PERM_VIEW_TOKEN_KEY, "old")
            .await
            .unwrap());
        assert!(acl
            .has_permission("alice", PERM_VIEW_TOKEN_KEY, "new")
            .await
            .unwrap());
    }
}

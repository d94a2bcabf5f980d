//! The token manager: issuance, update, rotation, visibility and secret
//! access, wired to the persistence, permission and directory boundaries.

pub mod expiry;
pub mod intent;

use std::sync::Arc;

use chrono::Utc;

use crate::directory::UserDirectory;
use crate::errors::AppError;
use crate::generators::{generate_id, generate_key};
use crate::models::{Actor, Token, TokenIntent};
use crate::perms::{PermissionOracle, PERM_VIEW_TOKEN_KEY};
use crate::store::{TokenPatch, TokenStore};

pub use expiry::ExpiryDefaults;

/// Creation request, public or system path. Every field is optional;
/// identifier and key are generated when absent.
#[derive(Debug, Clone, Default)]
pub struct CreateTokenRequest {
    pub identifier: Option<String>,
    pub intent: Option<TokenIntent>,
    pub expiring: Option<bool>,
    pub expires: Option<chrono::DateTime<Utc>>,
    pub description: Option<String>,
}

/// Fields accepted by the update path. `intent` is carried only so a change
/// attempt can be detected and rejected; it is never written.
#[derive(Debug, Clone, Default)]
pub struct UpdateTokenRequest {
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub user: Option<String>,
    pub intent: Option<TokenIntent>,
}

pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    perms: Arc<dyn PermissionOracle>,
    directory: Arc<dyn UserDirectory>,
    defaults: ExpiryDefaults,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        perms: Arc<dyn PermissionOracle>,
        directory: Arc<dyn UserDirectory>,
        defaults: ExpiryDefaults,
    ) -> Self {
        Self {
            store,
            perms,
            directory,
            defaults,
        }
    }

    /// Create a token through the public path. The actor becomes the owner
    /// and only user-settable intents are admitted.
    pub async fn create(
        &self,
        actor: &Actor,
        req: CreateTokenRequest,
    ) -> Result<Token, AppError> {
        self.create_inner(&actor.user, req, false).await
    }

    /// Trusted entry point for system-minted tokens (recovery links,
    /// verification flows, service tokens). Never routed over HTTP.
    pub async fn create_internal(
        &self,
        owner: &str,
        req: CreateTokenRequest,
    ) -> Result<Token, AppError> {
        self.create_inner(owner, req, true).await
    }

    async fn create_inner(
        &self,
        owner: &str,
        req: CreateTokenRequest,
        system_caller: bool,
    ) -> Result<Token, AppError> {
        let intent = req.intent.unwrap_or(TokenIntent::Api);
        intent::authorize_intent(intent, system_caller)?;

        let identifier = req.identifier.unwrap_or_else(generate_id);
        let policy = self.directory.policy(owner).await?;
        let now = Utc::now();
        let (expiring, expires) = expiry::resolve_expiry(
            &policy,
            intent,
            req.expiring,
            req.expires,
            now,
            &self.defaults,
        )?;

        let token = Token {
            identifier,
            key: generate_key(),
            user: owner.to_string(),
            intent,
            expiring,
            expires,
            description: req.description,
            created_at: now,
        };

        // Uniqueness is resolved here: a losing racer gets the conflict back
        // before any permission state exists.
        self.store.create(&token).await?;
        self.perms
            .grant(owner, PERM_VIEW_TOKEN_KEY, &token.identifier)
            .await?;

        tracing::info!(
            identifier = %token.identifier,
            intent = intent.as_str(),
            expiring = token.expiring,
            "token created"
        );
        Ok(token)
    }

    /// Update mutable fields. Owner changes are privileged-only and must not
    /// ride along with identity-defining fields: a request carrying both
    /// `user` and `intent` is rejected wholesale, nothing is written.
    pub async fn update(
        &self,
        actor: &Actor,
        identifier: &str,
        req: UpdateTokenRequest,
    ) -> Result<Token, AppError> {
        if req.user.is_some() && req.intent.is_some() {
            return Err(AppError::validation(
                "user cannot be changed together with intent",
            ));
        }

        let current = self
            .store
            .get(identifier)
            .await?
            .ok_or(AppError::NotFound)?;
        if !actor.privileged && current.user != actor.user {
            return Err(AppError::Forbidden);
        }
        if let Some(intent) = req.intent {
            if intent != current.intent {
                return Err(AppError::validation("intent cannot be changed"));
            }
        }
        if req.user.is_some() && !actor.privileged {
            return Err(AppError::Forbidden);
        }

        let patch = TokenPatch {
            identifier: req.identifier,
            description: req.description,
            user: req.user,
        };
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self
            .store
            .update(identifier, &patch)
            .await?
            .ok_or(AppError::NotFound)?;

        if updated.identifier != current.identifier {
            self.perms
                .rename_object(&current.identifier, &updated.identifier)
                .await?;
        }
        if updated.user != current.user {
            // transfer the view-secret grant to the new owner
            self.perms.revoke_object(&updated.identifier).await?;
            self.perms
                .grant(&updated.user, PERM_VIEW_TOKEN_KEY, &updated.identifier)
                .await?;
        }

        tracing::info!(identifier = %updated.identifier, "token updated");
        Ok(updated)
    }

    /// Regenerate (or explicitly set) a token's secret. Identity, ownership
    /// and expiry are untouched; the previous key stops authenticating the
    /// moment the store commits.
    pub async fn rotate_key(
        &self,
        actor: &Actor,
        identifier: &str,
        new_key: Option<String>,
    ) -> Result<(), AppError> {
        let current = self
            .store
            .get(identifier)
            .await?
            .ok_or(AppError::NotFound)?;
        if !actor.privileged && current.user != actor.user {
            return Err(AppError::Forbidden);
        }

        let key = new_key.unwrap_or_else(generate_key);
        if !self.store.set_key(identifier, &key).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(identifier = %identifier, "token key rotated");
        Ok(())
    }

    /// Tokens visible to the actor, in persisted insertion order. Privileged
    /// actors see everything; everyone else sees only their own.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Token>, AppError> {
        let all = self.store.list().await?;
        if actor.privileged {
            return Ok(all);
        }
        Ok(all.into_iter().filter(|t| t.user == actor.user).collect())
    }

    /// Read a token's secret. Requires the object-scoped view grant (bound to
    /// the owner at creation) or privilege.
    pub async fn get_secret(&self, actor: &Actor, identifier: &str) -> Result<String, AppError> {
        let token = self
            .store
            .get(identifier)
            .await?
            .ok_or(AppError::NotFound)?;
        let allowed = actor.privileged
            || self
                .perms
                .has_permission(&actor.user, PERM_VIEW_TOKEN_KEY, identifier)
                .await?;
        if !allowed {
            return Err(AppError::Forbidden);
        }
        Ok(token.key)
    }

    /// Delete a token and drop its object-scoped grants.
    pub async fn delete(&self, actor: &Actor, identifier: &str) -> Result<(), AppError> {
        let current = self
            .store
            .get(identifier)
            .await?
            .ok_or(AppError::NotFound)?;
        if !actor.privileged && current.user != actor.user {
            return Err(AppError::Forbidden);
        }
        if !self.store.delete(identifier).await? {
            return Err(AppError::NotFound);
        }
        self.perms.revoke_object(identifier).await?;
        tracing::info!(identifier = %identifier, "token deleted");
        Ok(())
    }

    /// Resolve a presented key to its token. Expiry is evaluated lazily here,
    /// at access time: an expired row may still exist, it just never
    /// authenticates.
    pub async fn authenticate(&self, key: &str) -> Result<Option<Token>, AppError> {
        let Some(token) = self.store.get_by_key(key).await? else {
            return Ok(None);
        };
        if token.is_expired(Utc::now()) {
            tracing::debug!(identifier = %token.identifier, "rejected expired token");
            return Ok(None);
        }
        Ok(Some(token))
    }
}

pub mod builtin;

use async_trait::async_trait;

use crate::errors::AppError;

/// Object-scoped permission: read a specific token's secret.
pub const PERM_VIEW_TOKEN_KEY: &str = "view_token_key";

/// Abstraction over the external permission engine.
/// The token core only needs grant/check/revoke on (actor, permission, object)
/// triples; any ACL table or policy engine satisfying this contract works.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Grant `actor` the named permission on a specific object.
    async fn grant(&self, actor: &str, permission: &str, object: &str) -> Result<(), AppError>;

    /// Check whether `actor` holds the named permission on the object.
    async fn has_permission(
        &self,
        actor: &str,
        permission: &str,
        object: &str,
    ) -> Result<bool, AppError>;

    /// Drop every grant scoped to the object (token deleted or owner changed).
    async fn revoke_object(&self, object: &str) -> Result<(), AppError>;

    /// Re-scope existing grants when the object is renamed.
    async fn rename_object(&self, old: &str, new: &str) -> Result<(), AppError>;
}

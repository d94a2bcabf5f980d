use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::directory::UserDirectory;
use crate::errors::AppError;
use crate::models::{Token, TokenIntent, UserPolicy};
use crate::perms::PermissionOracle;
use crate::store::{TokenPatch, TokenStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Write a user's attribute object, validating the token policy fields
    /// first so malformed lifetime strings never reach the tokens path.
    pub async fn set_user_attributes(
        &self,
        user: &str,
        attrs: serde_json::Value,
    ) -> Result<(), AppError> {
        UserPolicy::from_attributes(&attrs)
            .map_err(|e| AppError::validation(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO users (id, attributes) VALUES ($1, $2)
               ON CONFLICT (id) DO UPDATE SET attributes = EXCLUDED.attributes"#,
        )
        .bind(user)
        .bind(attrs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    identifier: String,
    key: String,
    user_id: String,
    intent: String,
    expiring: bool,
    expires: DateTime<Utc>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self) -> Result<Token, AppError> {
        let intent: TokenIntent = self
            .intent
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
        Ok(Token {
            identifier: self.identifier,
            key: self.key,
            user: self.user_id,
            intent,
            expiring: self.expiring,
            expires: self.expires,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

const TOKEN_COLUMNS: &str =
    "identifier, key, user_id, intent, expiring, expires, description, created_at";

fn map_unique_violation(e: sqlx::Error, identifier: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::validation(format!(
            "token identifier already in use: {}",
            identifier
        )),
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn create(&self, token: &Token) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO tokens (identifier, key, user_id, intent, expiring, expires, description, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&token.identifier)
        .bind(&token.key)
        .bind(&token.user)
        .bind(token.intent.as_str())
        .bind(token.expiring)
        .bind(token.expires)
        .bind(&token.description)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &token.identifier))?;
        Ok(())
    }

    async fn get(&self, identifier: &str) -> Result<Option<Token>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TokenRow::into_token).transpose()
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Token>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TokenRow::into_token).transpose()
    }

    async fn update(
        &self,
        identifier: &str,
        patch: &TokenPatch,
    ) -> Result<Option<Token>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            r#"UPDATE tokens SET
                 identifier = COALESCE($2, identifier),
                 description = COALESCE($3, description),
                 user_id = COALESCE($4, user_id)
               WHERE identifier = $1
               RETURNING {TOKEN_COLUMNS}"#
        ))
        .bind(identifier)
        .bind(&patch.identifier)
        .bind(&patch.description)
        .bind(&patch.user)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, patch.identifier.as_deref().unwrap_or(identifier))
        })?;
        row.map(TokenRow::into_token).transpose()
    }

    async fn set_key(&self, identifier: &str, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE tokens SET key = $2 WHERE identifier = $1")
            .bind(identifier)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, identifier: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE identifier = $1")
            .bind(identifier)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Token>, AppError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expiring AND expires <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PermissionOracle for PgStore {
    async fn grant(&self, actor: &str, permission: &str, object: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO object_permissions (actor, permission, object)
               VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"#,
        )
        .bind(actor)
        .bind(permission)
        .bind(object)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_permission(
        &self,
        actor: &str,
        permission: &str,
        object: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                 SELECT 1 FROM object_permissions
                 WHERE actor = $1 AND permission = $2 AND object = $3)"#,
        )
        .bind(actor)
        .bind(permission)
        .bind(object)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn revoke_object(&self, object: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM object_permissions WHERE object = $1")
            .bind(object)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rename_object(&self, old: &str, new: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE object_permissions SET object = $2 WHERE object = $1")
            .bind(old)
            .bind(new)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn policy(&self, user: &str) -> Result<UserPolicy, AppError> {
        let attrs = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT attributes FROM users WHERE id = $1",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        match attrs {
            Some(attrs) => UserPolicy::from_attributes(&attrs).map_err(AppError::Internal),
            None => Ok(UserPolicy::default()),
        }
    }
}

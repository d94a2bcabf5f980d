use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::manager::{CreateTokenRequest, UpdateTokenRequest};
use crate::models::{Actor, Token, TokenIntent};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTokenBody {
    pub identifier: Option<String>,
    pub intent: Option<TokenIntent>,
    pub expiring: Option<bool>,
    pub expires: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTokenBody {
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub user: Option<String>,
    pub intent: Option<TokenIntent>,
}

#[derive(Deserialize, Default)]
pub struct RotateKeyBody {
    pub key: Option<String>,
}

/// Token view without the secret. The key is only readable through the
/// dedicated `/key` route, which checks the view grant.
#[derive(Serialize)]
pub struct TokenResponse {
    pub identifier: String,
    pub user: String,
    pub intent: TokenIntent,
    pub expiring: bool,
    pub expires: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Token> for TokenResponse {
    fn from(t: Token) -> Self {
        TokenResponse {
            identifier: t.identifier,
            user: t.user,
            intent: t.intent,
            expiring: t.expiring,
            expires: t.expires,
            description: t.description,
            created_at: t.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct KeyResponse {
    pub key: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /tokens — tokens visible to the actor, in persisted order
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<TokenResponse>>, AppError> {
    let tokens = state.manager.list(&actor).await?;
    Ok(Json(tokens.into_iter().map(TokenResponse::from).collect()))
}

/// POST /tokens — create a token through the public path
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateTokenBody>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let req = CreateTokenRequest {
        identifier: body.identifier,
        intent: body.intent,
        expiring: body.expiring,
        expires: body.expires,
        description: body.description,
    };
    let token = state.manager.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(token.into())))
}

/// PUT /tokens/:identifier — update mutable fields
pub async fn update_token(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(identifier): Path<String>,
    Json(body): Json<UpdateTokenBody>,
) -> Result<Json<TokenResponse>, AppError> {
    let req = UpdateTokenRequest {
        identifier: body.identifier,
        description: body.description,
        user: body.user,
        intent: body.intent,
    };
    let token = state.manager.update(&actor, &identifier, req).await?;
    Ok(Json(token.into()))
}

/// DELETE /tokens/:identifier
pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, AppError> {
    state.manager.delete(&actor, &identifier).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tokens/:identifier/rotate — regenerate (or set) the secret
pub async fn rotate_key(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(identifier): Path<String>,
    body: Option<Json<RotateKeyBody>>,
) -> Result<StatusCode, AppError> {
    let new_key = body.and_then(|Json(b)| b.key);
    state.manager.rotate_key(&actor, &identifier, new_key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tokens/:identifier/key — read the secret (view grant required)
pub async fn view_key(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(identifier): Path<String>,
) -> Result<Json<KeyResponse>, AppError> {
    let key = state.manager.get_secret(&actor, &identifier).await?;
    Ok(Json(KeyResponse { key }))
}

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::models::Actor;
use crate::AppState;

pub mod handlers;

/// Build the token API router.
/// All routes are relative — the caller mounts this under `/api/v1`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/tokens",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route(
            "/tokens/:identifier",
            put(handlers::update_token).delete(handlers::delete_token),
        )
        .route("/tokens/:identifier/rotate", post(handlers::rotate_key))
        .route("/tokens/:identifier/key", get(handlers::view_key))
        .layer(middleware::from_fn(actor_auth))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: resolves the acting principal.
/// `X-Actor` names the user; a matching `X-Admin-Key` header (or
/// `Authorization: Bearer`) against TOKEND_ADMIN_KEY marks the actor
/// privileged. Requests without an actor are rejected with 401.
async fn actor_auth(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user = req
        .headers()
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let Some(user) = user else {
        tracing::warn!("token API: missing X-Actor header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided_key = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        });

    let privileged = match (provided_key, std::env::var("TOKEND_ADMIN_KEY").ok()) {
        (Some(provided), Some(expected)) if provided == expected => true,
        (Some(provided), _) => {
            // SECURITY: Never log the expected key or the full provided key
            let masked = if provided.len() > 8 {
                format!("{}…{}", &provided[..4], &provided[provided.len() - 4..])
            } else {
                "****".to_string()
            };
            tracing::warn!("token API: invalid admin key (provided: '{}')", masked);
            return Err(StatusCode::UNAUTHORIZED);
        }
        (None, _) => false,
    };

    let actor = if privileged {
        Actor::privileged(user)
    } else {
        Actor::user(user)
    };
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

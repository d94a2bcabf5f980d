use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokend::api;
use tokend::cli;
use tokend::config;
use tokend::jobs;
use tokend::manager::{CreateTokenRequest, ExpiryDefaults, TokenManager};
use tokend::models::Actor;
use tokend::store::postgres::PgStore;
use tokend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tokend=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Token { command }) => {
            let store = Arc::new(PgStore::connect(&cfg.database_url).await?);
            store.migrate().await?;
            let manager = build_manager(store, &cfg);
            handle_token_command(command, &manager).await
        }
        Some(cli::Commands::User { command }) => {
            let store = Arc::new(PgStore::connect(&cfg.database_url).await?);
            store.migrate().await?;
            handle_user_command(command, &store).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn build_manager(store: Arc<PgStore>, cfg: &config::Config) -> TokenManager {
    TokenManager::new(
        store.clone(),
        store.clone(),
        store,
        ExpiryDefaults {
            default_lifetime: cfg.default_token_lifetime,
        },
    )
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let store = Arc::new(PgStore::connect(&cfg.database_url).await?);

    tracing::info!("Running migrations...");
    store.migrate().await?;

    let manager = build_manager(store.clone(), &cfg);
    let sweep_interval = cfg.sweep_interval_secs;
    let state = Arc::new(AppState {
        manager,
        config: cfg,
    });

    let app = axum::Router::new()
        // Health endpoint (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        // Token API — nested under /api/v1 (preserves middleware + fallback)
        .nest("/api/v1", api::api_router())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    jobs::sweeper::spawn(store, sweep_interval);
    tracing::info!("Expiry sweeper started (every {}s)", sweep_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("tokend listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
/// This allows clients to correlate errors with service logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn handle_token_command(
    cmd: cli::TokenCommands,
    manager: &TokenManager,
) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create {
            user,
            identifier,
            intent,
            expires,
            description,
        } => {
            let intent = intent
                .map(|raw| raw.parse().map_err(|e: String| anyhow::anyhow!(e)))
                .transpose()?;
            let expires = expires
                .map(|raw| {
                    chrono::DateTime::parse_from_rfc3339(&raw)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .context("invalid --expires timestamp (want RFC 3339)")
                })
                .transpose()?;

            let req = CreateTokenRequest {
                identifier,
                intent,
                expiring: None,
                expires,
                description,
            };
            // operator CLI is the trusted system path
            let token = manager.create_internal(&user, req).await?;
            println!(
                "Token created:\n  Identifier: {}\n  Intent:     {}\n  Expires:    {}\n  Key:        {}",
                token.identifier,
                token.intent.as_str(),
                if token.expiring {
                    token.expires.to_rfc3339()
                } else {
                    "never".into()
                },
                token.key
            );
        }
        cli::TokenCommands::List { user } => {
            let actor = match user {
                Some(u) => Actor::user(u),
                None => Actor::privileged("system"),
            };
            let tokens = manager.list(&actor).await?;
            if tokens.is_empty() {
                println!("No tokens found.");
            } else {
                println!("{:<42} {:<16} {:<16} EXPIRES", "IDENTIFIER", "USER", "INTENT");
                for t in tokens {
                    println!(
                        "{:<42} {:<16} {:<16} {}",
                        t.identifier,
                        t.user,
                        t.intent.as_str(),
                        if t.expiring {
                            t.expires.format("%Y-%m-%d %H:%M").to_string()
                        } else {
                            "never".into()
                        }
                    );
                }
            }
        }
        cli::TokenCommands::Rotate { identifier, key } => {
            manager
                .rotate_key(&Actor::privileged("system"), &identifier, key)
                .await?;
            println!("Key rotated.");
        }
        cli::TokenCommands::Delete { identifier } => {
            manager
                .delete(&Actor::privileged("system"), &identifier)
                .await?;
            println!("Token deleted.");
        }
    }
    Ok(())
}

async fn handle_user_command(cmd: cli::UserCommands, store: &PgStore) -> anyhow::Result<()> {
    match cmd {
        cli::UserCommands::SetAttributes { user, attributes } => {
            let attrs: serde_json::Value =
                serde_json::from_str(&attributes).context("invalid --attributes JSON")?;
            store.set_user_attributes(&user, attrs).await?;
            println!("Attributes stored for {}.", user);
        }
    }
    Ok(())
}

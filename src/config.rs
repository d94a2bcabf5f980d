use chrono::Duration;

use crate::models::policy::parse_duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub admin_key: Option<String>,
    /// Expiry window applied when a token request carries no (usable) expiry.
    /// Set via TOKEND_DEFAULT_TOKEN_LIFETIME (duration string, e.g. "days=30").
    pub default_token_lifetime: Duration,
    /// Seconds between expired-token sweeps.
    /// Set via TOKEND_SWEEP_INTERVAL. Default: 3600.
    pub sweep_interval_secs: u64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let admin_key = std::env::var("TOKEND_ADMIN_KEY").ok();
    if admin_key.is_none() {
        let env_mode = std::env::var("TOKEND_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "TOKEND_ADMIN_KEY is not set. Privileged API access is impossible \
                 without it; set a strong random key before running in production."
            );
        }
        eprintln!("⚠️  TOKEND_ADMIN_KEY is not set — privileged API access is disabled.");
    }

    let default_token_lifetime = match std::env::var("TOKEND_DEFAULT_TOKEN_LIFETIME") {
        Ok(raw) => parse_duration(&raw)
            .map_err(|e| anyhow::anyhow!("invalid TOKEND_DEFAULT_TOKEN_LIFETIME: {}", e))?,
        Err(_) => Duration::days(30),
    };

    Ok(Config {
        port: std::env::var("TOKEND_PORT")
            .unwrap_or_else(|_| "8300".into())
            .parse()
            .unwrap_or(8300),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tokend".into()),
        admin_key,
        default_token_lifetime,
        sweep_interval_secs: std::env::var("TOKEND_SWEEP_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600),
    })
}

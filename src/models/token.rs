use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purpose classification of a token. Gates which creation paths apply:
/// only the user-settable intents may be minted through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenIntent {
    /// Single-use verification flows (email confirmation etc). System-reserved.
    Verification,
    /// Plain API access. The default for public creation.
    Api,
    /// Account recovery. System-reserved.
    Recovery,
    /// App passwords: long-lived per-application secrets.
    AppPassword,
    /// Service-to-service tokens minted by the deployment itself. System-reserved.
    InternalService,
}

impl TokenIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenIntent::Verification => "verification",
            TokenIntent::Api => "api",
            TokenIntent::Recovery => "recovery",
            TokenIntent::AppPassword => "app_password",
            TokenIntent::InternalService => "internal_service",
        }
    }

    /// Intents that may be requested through the public creation path.
    pub fn is_user_settable(&self) -> bool {
        matches!(self, TokenIntent::Api | TokenIntent::AppPassword)
    }

    /// Intents whose requested expiry is validated against the owner's
    /// maximum-lifetime attribute (and rejected when it exceeds it).
    /// Non-cap-subject intents get the system default window instead.
    pub fn is_cap_subject(&self) -> bool {
        matches!(self, TokenIntent::AppPassword)
    }
}

impl std::str::FromStr for TokenIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verification" => Ok(TokenIntent::Verification),
            "api" => Ok(TokenIntent::Api),
            "recovery" => Ok(TokenIntent::Recovery),
            "app_password" => Ok(TokenIntent::AppPassword),
            "internal_service" => Ok(TokenIntent::InternalService),
            other => Err(format!("unknown token intent: {}", other)),
        }
    }
}

/// A stored token. `key` is the secret; it never appears in list/detail
/// responses and is only readable through the view-key path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub identifier: String,
    pub key: String,
    pub user: String,
    pub intent: TokenIntent,
    pub expiring: bool,
    pub expires: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Lazy expiry predicate: a token is expired when it is marked expiring
    /// and its deadline has passed. Never enforced by a timer.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiring && self.expires <= now
    }
}

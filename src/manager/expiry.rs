//! Expiry policy resolution.
//!
//! The asymmetry between cap-subject and other intents is deliberate and
//! matches the upstream behavior: app-password expiries are validated against
//! the owner's maximum-lifetime attribute and rejected when over it, while
//! API-token expiries are never caller-controlled at all — any requested
//! value is replaced with the system default window, silently.

use chrono::{DateTime, Duration, Utc};

use crate::errors::AppError;
use crate::models::{TokenIntent, UserPolicy};

/// System-wide expiry defaults, sourced from config.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryDefaults {
    /// Window applied when no (valid) expiry is requested.
    pub default_lifetime: Duration,
}

/// Compute `(expiring, expires)` for a new token.
pub fn resolve_expiry(
    policy: &UserPolicy,
    intent: TokenIntent,
    expiring: Option<bool>,
    requested: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    defaults: &ExpiryDefaults,
) -> Result<(bool, DateTime<Utc>), AppError> {
    let expiring = expiring.unwrap_or(policy.token_expiring);
    let default_expires = now + defaults.default_lifetime;

    if !expiring {
        // expires is never enforced for non-expiring tokens; store the
        // default window as an inert placeholder.
        return Ok((false, default_expires));
    }

    let Some(requested) = requested else {
        return Ok((true, default_expires));
    };

    if intent.is_cap_subject() {
        if let Some(lifetime) = policy.token_maximum_lifetime {
            let cap = now + lifetime;
            if requested > cap {
                return Err(AppError::validation(format!(
                    "requested expiry exceeds the maximum token lifetime ({})",
                    cap.to_rfc3339()
                )));
            }
        }
        // under the cap (or no cap configured): the request round-trips exactly
        Ok((true, requested))
    } else {
        // non-cap-subject intents cannot override their expiry; clamp to the
        // default window without failing the operation
        Ok((true, default_expires))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ExpiryDefaults {
        ExpiryDefaults {
            default_lifetime: Duration::days(30),
        }
    }

    fn policy(expiring: bool, lifetime: Option<Duration>) -> UserPolicy {
        UserPolicy {
            token_expiring: expiring,
            token_maximum_lifetime: lifetime,
        }
    }

    #[test]
    fn test_expiring_defaults_to_user_attribute() {
        let now = Utc::now();
        let (expiring, _) =
            resolve_expiry(&policy(false, None), TokenIntent::Api, None, None, now, &defaults())
                .unwrap();
        assert!(!expiring);

        let (expiring, expires) =
            resolve_expiry(&policy(true, None), TokenIntent::Api, None, None, now, &defaults())
                .unwrap();
        assert!(expiring);
        assert_eq!(expires, now + Duration::days(30));
    }

    #[test]
    fn test_explicit_flag_overrides_attribute() {
        let now = Utc::now();
        let (expiring, _) = resolve_expiry(
            &policy(true, None),
            TokenIntent::Api,
            Some(false),
            None,
            now,
            &defaults(),
        )
        .unwrap();
        assert!(!expiring);
    }

    #[test]
    fn test_app_password_under_cap_round_trips() {
        let now = Utc::now();
        let requested = now + Duration::hours(1);
        let (_, expires) = resolve_expiry(
            &policy(true, Some(Duration::hours(2))),
            TokenIntent::AppPassword,
            None,
            Some(requested),
            now,
            &defaults(),
        )
        .unwrap();
        assert_eq!(expires, requested);
    }

    #[test]
    fn test_app_password_over_cap_rejected() {
        let now = Utc::now();
        let err = resolve_expiry(
            &policy(true, Some(Duration::hours(2))),
            TokenIntent::AppPassword,
            None,
            Some(now + Duration::hours(3)),
            now,
            &defaults(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_app_password_without_cap_accepts_any_future_expiry() {
        let now = Utc::now();
        let requested = now + Duration::days(3650);
        let (_, expires) = resolve_expiry(
            &policy(true, None),
            TokenIntent::AppPassword,
            None,
            Some(requested),
            now,
            &defaults(),
        )
        .unwrap();
        assert_eq!(expires, requested);
    }

    #[test]
    fn test_api_intent_expiry_is_clamped_not_rejected() {
        let now = Utc::now();
        let requested = now + Duration::seconds(3);
        let (expiring, expires) = resolve_expiry(
            &policy(true, Some(Duration::hours(2))),
            TokenIntent::Api,
            None,
            Some(requested),
            now,
            &defaults(),
        )
        .unwrap();
        assert!(expiring);
        assert_ne!(expires, requested);
        assert_eq!(expires, now + Duration::days(30));
    }
}

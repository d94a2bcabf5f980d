//! Per-user token policy, resolved once per operation from the user
//! directory's attribute blob.

use chrono::Duration;

/// Attribute key: whether tokens created by this user expire by default.
pub const ATTR_TOKEN_EXPIRING: &str = "token_expiring";
/// Attribute key: duration string capping how far in the future a
/// cap-subject token's expiry may be set (e.g. `"hours=2"`).
pub const ATTR_TOKEN_MAXIMUM_LIFETIME: &str = "token_maximum_lifetime";

#[derive(Debug, Clone)]
pub struct UserPolicy {
    pub token_expiring: bool,
    pub token_maximum_lifetime: Option<Duration>,
}

impl Default for UserPolicy {
    fn default() -> Self {
        UserPolicy {
            token_expiring: true,
            token_maximum_lifetime: None,
        }
    }
}

impl UserPolicy {
    /// Build a policy from a raw user attribute object. Malformed lifetime
    /// strings fail here, so directory writes reject them up front and token
    /// creation never sees an unparseable cap.
    pub fn from_attributes(attrs: &serde_json::Value) -> anyhow::Result<Self> {
        let token_expiring = attrs
            .get(ATTR_TOKEN_EXPIRING)
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let token_maximum_lifetime = match attrs.get(ATTR_TOKEN_MAXIMUM_LIFETIME) {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => {
                let raw = v
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("{} must be a string", ATTR_TOKEN_MAXIMUM_LIFETIME))?;
                Some(parse_duration(raw)?)
            }
        };

        Ok(UserPolicy {
            token_expiring,
            token_maximum_lifetime,
        })
    }
}

/// Parse a duration string of the form `"hours=2"` or `"days=1,hours=3"`.
/// Accepted units: `days`, `hours`, `minutes`, `seconds`.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let mut total = Duration::zero();
    if raw.trim().is_empty() {
        anyhow::bail!("empty duration string");
    }

    for part in raw.split(',') {
        let (unit, value) = part
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid duration segment: {}", part))?;
        let value: i64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid duration value: {}", part))?;
        if value < 0 {
            anyhow::bail!("negative duration value: {}", part);
        }
        let segment = match unit.trim() {
            "days" => Duration::days(value),
            "hours" => Duration::hours(value),
            "minutes" => Duration::minutes(value),
            "seconds" => Duration::seconds(value),
            other => anyhow::bail!("unknown duration unit: {}", other),
        };
        total = total
            .checked_add(&segment)
            .ok_or_else(|| anyhow::anyhow!("duration overflow: {}", raw))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_unit() {
        assert_eq!(parse_duration("hours=2").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("seconds=30").unwrap(), Duration::seconds(30));
    }

    #[test]
    fn test_parse_combined_units() {
        assert_eq!(
            parse_duration("days=1,hours=3").unwrap(),
            Duration::days(1) + Duration::hours(3)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("2h").is_err());
        assert!(parse_duration("hours=two").is_err());
        assert!(parse_duration("fortnights=1").is_err());
        assert!(parse_duration("hours=-1").is_err());
    }

    #[test]
    fn test_policy_defaults() {
        let policy = UserPolicy::from_attributes(&json!({})).unwrap();
        assert!(policy.token_expiring);
        assert!(policy.token_maximum_lifetime.is_none());
    }

    #[test]
    fn test_policy_from_attributes() {
        let policy = UserPolicy::from_attributes(&json!({
            "token_expiring": false,
            "token_maximum_lifetime": "hours=2",
        }))
        .unwrap();
        assert!(!policy.token_expiring);
        assert_eq!(policy.token_maximum_lifetime, Some(Duration::hours(2)));
    }

    #[test]
    fn test_policy_rejects_bad_lifetime() {
        assert!(UserPolicy::from_attributes(&json!({
            "token_maximum_lifetime": "later"
        }))
        .is_err());
        assert!(UserPolicy::from_attributes(&json!({
            "token_maximum_lifetime": 7200
        }))
        .is_err());
    }
}

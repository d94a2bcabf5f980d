//! Intent gate: which token intents each creation path may mint.

use crate::errors::AppError;
use crate::models::TokenIntent;

/// Validate a requested intent against the calling path. The public API may
/// only mint user-settable intents; reserved intents (recovery, verification,
/// internal service) are restricted to trusted system callers.
pub fn authorize_intent(intent: TokenIntent, system_caller: bool) -> Result<(), AppError> {
    if system_caller || intent.is_user_settable() {
        return Ok(());
    }
    Err(AppError::validation(format!(
        "intent {} cannot be set through the public API",
        intent.as_str()
    )))
}

//! Random identifier and secret generation.
//!
//! Both generators draw from the OS RNG. Identifiers are 128-bit (collision
//! resistance for human-visible names), keys are 256-bit.

use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a random token identifier (32 hex chars).
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    format!("tokend-{}", hex::encode(bytes))
}

/// Generate a fresh token secret (64 hex chars).
pub fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

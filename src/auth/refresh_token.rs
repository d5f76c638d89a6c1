/// Refresh Token Generation
///
/// Refresh tokens are opaque credentials:
/// - 64 bytes from a CSPRNG, base64-encoded
/// - No embedded structure or expiry; the expiry lives on the account row
/// - Single-use: every successful refresh overwrites the stored token
///
/// Storage, comparison and rotation are the user store's concern.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{thread_rng, RngCore};

use crate::configuration::JwtSettings;
use crate::model::RefreshSession;

const REFRESH_TOKEN_BYTES: usize = 64;

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}

/// Generate a fresh token together with its expiry.
///
/// The pair travels as one value so the two columns backing it cannot be
/// written independently.
pub fn issue_refresh_session(config: &JwtSettings) -> RefreshSession {
    RefreshSession {
        token: generate_refresh_token(),
        expires_at: Utc::now() + Duration::seconds(config.refresh_token_expiry),
    }
}

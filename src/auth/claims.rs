/// JWT Claims structure
///
/// Represents the payload of an access token containing the account's
/// identity and standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Account role ("User" or "Admin")
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl Claims {
    /// Create new claims for an account
    ///
    /// # Arguments
    /// * `username` - Account username (becomes the subject)
    /// * `role` - Account role
    /// * `expiry_seconds` - Token expiration in seconds from now
    /// * `issuer` - Issuer identifier
    /// * `audience` - Audience identifier
    pub fn new(
        username: &str,
        role: &str,
        expiry_seconds: i64,
        issuer: String,
        audience: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: username.to_string(),
            role: role.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            aud: audience,
        }
    }

    /// Check if the token's lifetime has elapsed
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

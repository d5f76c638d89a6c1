/// JWT Token Generation and Validation
///
/// Handles creation and validation of HS512-signed access tokens, including
/// the relaxed-lifetime decode used by the refresh flow to recover identity
/// claims from an expired token.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::ApiError;

/// Generate a new access token for an account
///
/// # Arguments
/// * `username` - Account username (token subject)
/// * `role` - Account role carried in the token
/// * `config` - JWT configuration settings
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(
    username: &str,
    role: &str,
    config: &JwtSettings,
) -> Result<String, ApiError> {
    let claims = Claims::new(
        username,
        role,
        config.access_token_expiry,
        config.issuer.clone(),
        config.audience.clone(),
    );

    encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal("token.generate", format!("Token generation failed: {}", e)))
}

/// Signature, algorithm, issuer and audience checks shared by both decoders.
///
/// Pinning the algorithm to HS512 rejects tokens signed with anything else,
/// even when the signature would otherwise verify.
fn base_validation(config: &JwtSettings) -> Validation {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation
}

/// Validate and extract claims from an access token
///
/// # Arguments
/// * `token` - JWT token string
/// * `config` - JWT configuration settings
///
/// # Errors
/// Returns error if token is invalid, expired, or tampered with
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &base_validation(config),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        ApiError::unauthorized("token.validate", "Invalid or expired token.")
    })
}

/// Extract claims from a possibly-expired access token
///
/// Signature, algorithm, issuer and audience are enforced exactly as in
/// [`validate_access_token`]; only the lifetime check is relaxed. Used by
/// the refresh flow, where the access token establishes identity and the
/// refresh token establishes the session.
///
/// # Errors
/// Returns error if the token fails any check other than expiry
pub fn decode_expired_access_token(token: &str, config: &JwtSettings) -> Result<Claims, ApiError> {
    let mut validation = base_validation(config);
    validation.validate_exp = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT identity recovery error: {}", e);
        ApiError::unauthorized("token.decode", "Invalid access token.")
    })
}

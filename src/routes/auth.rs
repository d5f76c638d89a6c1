/// Authentication Routes
///
/// Handles account registration and login. Both issue a fresh access+refresh
/// token pair, return it in the body and attach it as credential cookies.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    generate_access_token, hash_password, issue_refresh_session, verify_password, PasswordError,
};
use crate::configuration::JwtSettings;
use crate::error::{ApiError, ErrorKind};
use crate::model::NewUser;
use crate::routes::token::token_cookies;
use crate::store::UserStore;
use crate::validators::{is_valid_email, is_valid_username};

/// Account registration request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Token pair returned by register, login and refresh
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /api/auth/register
///
/// Register a new account with username, email, and password.
/// Returns the access and refresh tokens on success.
///
/// Each failure step is terminal; nothing already persisted is rolled
/// back, so a failure after account creation leaves a created-but-not-
/// fully-onboarded account behind.
///
/// # Errors
/// - 400: Validation errors, username or email already taken
/// - 500: Token pair could not be persisted
pub async fn register(
    body: web::Json<RegisterRequest>,
    user_store: web::Data<dyn UserStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, ApiError> {
    // Validate inputs
    let username = is_valid_username(&body.user_name)
        .map_err(|e| ApiError::validation("userName", e.to_string()))?;
    let email =
        is_valid_email(&body.email).map_err(|e| ApiError::validation("email", e.to_string()))?;

    // Username taken, matched case-insensitively
    if user_store
        .find_by_username(&username)
        .await
        .map_err(|e| ApiError::internal("user_store.find_by_username", e))?
        .is_some()
    {
        return Err(ApiError::conflict(
            "user_store.find_by_username",
            "Username has already been taken.",
        ));
    }

    // Hash the password; every unmet strength requirement is reported
    let password_hash = hash_password(&body.password).map_err(|e| match e {
        PasswordError::Policy(reasons) => {
            ApiError::new(ErrorKind::Validation, "user_store.create", reasons)
        }
        PasswordError::Hash(msg) => ApiError::internal("user_store.create", msg),
    })?;

    let user = user_store
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| ApiError::from_store("user_store.create", e))?;

    // Default role; revoking tokens requires "Admin", assigned out of band
    user_store
        .assign_role(user.id, "User")
        .await
        .map_err(|e| ApiError::from_store("user_store.assign_role", e))?;

    // Issue the pair and persist the refresh session
    let access_token = generate_access_token(&user.username, "User", jwt_config.get_ref())?;
    let session = issue_refresh_session(jwt_config.get_ref());
    let refresh_token = session.token.clone();

    user_store
        .update_session(user.id, Some(session))
        .await
        .map_err(|e| ApiError::from_store("user_store.update_session", e))?;

    tracing::info!(
        username = %user.username,
        user_id = %user.id,
        "User registered successfully"
    );

    let (access, refresh) = token_cookies(&access_token, &refresh_token, jwt_config.get_ref());
    Ok(HttpResponse::Ok()
        .cookie(access)
        .cookie(refresh)
        .json(CredentialsResponse {
            access_token,
            refresh_token,
        }))
}

/// POST /api/auth/login
///
/// Authenticate with username and password. Always rotates the refresh
/// session, so any earlier session for the account stops being redeemable.
///
/// # Errors
/// - 400: Malformed username
/// - 404: Unknown username
/// - 401: Wrong password
/// - 500: Token pair could not be persisted
pub async fn login(
    body: web::Json<LoginRequest>,
    user_store: web::Data<dyn UserStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, ApiError> {
    let username = is_valid_username(&body.user_name)
        .map_err(|e| ApiError::validation("userName", e.to_string()))?;

    let user = user_store
        .find_by_username(&username)
        .await
        .map_err(|e| ApiError::internal("user_store.find_by_username", e))?
        .ok_or_else(|| ApiError::not_found("user_store.find_by_username", "User not found."))?;

    // Verify password
    let credentials_valid = verify_password(&body.password, &user.password_hash)
        .map_err(|e| ApiError::internal("auth.verify_password", e))?;
    if !credentials_valid {
        return Err(ApiError::unauthorized(
            "auth.verify_password",
            "Invalid username or password.",
        ));
    }

    // The token carries the stored role, so an Admin's pair can revoke
    let role = user_store
        .role_of(user.id)
        .await
        .map_err(|e| ApiError::internal("user_store.role_of", e))?;

    let access_token = generate_access_token(&user.username, &role, jwt_config.get_ref())?;
    let session = issue_refresh_session(jwt_config.get_ref());
    let refresh_token = session.token.clone();

    user_store
        .update_session(user.id, Some(session))
        .await
        .map_err(|e| ApiError::from_store("user_store.update_session", e))?;

    tracing::info!(
        username = %user.username,
        user_id = %user.id,
        "User logged in successfully"
    );

    let (access, refresh) = token_cookies(&access_token, &refresh_token, jwt_config.get_ref());
    Ok(HttpResponse::Ok()
        .cookie(access)
        .cookie(refresh)
        .json(CredentialsResponse {
            access_token,
            refresh_token,
        }))
}

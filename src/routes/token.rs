/// Token Lifecycle Routes
///
/// Handles refresh-token rotation and administrative revocation, plus the
/// cookie attachment both the auth and token routes share.
///
/// The two tokens ride two cookies: `Access` (short-lived, whole site) and
/// `Refresh` (longer-lived, scoped to the refresh path so browsers only
/// present it where it can be redeemed). Both are Secure, HttpOnly and
/// SameSite=Strict.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::auth::{
    decode_expired_access_token, generate_access_token, issue_refresh_session, Claims,
};
use crate::configuration::JwtSettings;
use crate::error::ApiError;
use crate::routes::auth::CredentialsResponse;
use crate::store::UserStore;

pub(crate) const ACCESS_COOKIE: &str = "Access";
pub(crate) const REFRESH_COOKIE: &str = "Refresh";
pub(crate) const REFRESH_COOKIE_PATH: &str = "/api/token/refresh";

/// Build the pair of credential cookies for an issued token pair.
pub(crate) fn token_cookies(
    access_token: &str,
    refresh_token: &str,
    config: &JwtSettings,
) -> (Cookie<'static>, Cookie<'static>) {
    let access = Cookie::build(ACCESS_COOKIE, access_token.to_string())
        .path("/")
        .max_age(Duration::seconds(config.access_token_expiry))
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();

    let refresh = Cookie::build(REFRESH_COOKIE, refresh_token.to_string())
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::seconds(config.refresh_token_expiry))
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();

    (access, refresh)
}

/// POST /api/token/refresh
///
/// Redeem a live refresh token for a fresh access+refresh pair without
/// re-authenticating. Identity comes from the `Access` cookie, whose token
/// may be expired but must otherwise verify; the session comes from the
/// `Refresh` cookie. The new access token carries the same claims the old
/// one did, so the role survives without a store round trip.
///
/// Rotation is single-use: the stored token is swapped under a guard, and
/// when two calls race on one account only the first wins.
///
/// # Errors
/// - 401: Missing cookie, or the access token fails signature/issuer/
///   audience/algorithm checks
/// - 404: Account no longer exists
/// - 403: Refresh token mismatched, expired, or already consumed
/// - 500: Rotation could not be persisted
pub async fn refresh_token(
    req: HttpRequest,
    user_store: web::Data<dyn UserStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, ApiError> {
    let access_cookie = req
        .cookie(ACCESS_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("token.refresh", "Missing access token."))?;
    let refresh_cookie = req
        .cookie(REFRESH_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("token.refresh", "Missing refresh token."))?;

    // Recover identity, ignoring only the lifetime check
    let claims = decode_expired_access_token(access_cookie.value(), jwt_config.get_ref())?;
    if claims.is_expired() {
        tracing::debug!(
            username = %claims.sub,
            "Identity recovered from expired access token"
        );
    }

    let user = user_store
        .find_by_username(&claims.sub)
        .await
        .map_err(|e| ApiError::internal("user_store.find_by_username", e))?
        .ok_or_else(|| ApiError::not_found("user_store.find_by_username", "User not found."))?;

    // Exact token match and unexpired, or the session is not redeemable
    let session = user
        .refresh_session()
        .filter(|s| s.token == refresh_cookie.value() && s.expires_at > Utc::now())
        .ok_or_else(|| {
            ApiError::forbidden("token.refresh", "Invalid or expired refresh token.")
        })?;

    let access_token =
        generate_access_token(&claims.sub, &claims.role, jwt_config.get_ref())?;
    let next = issue_refresh_session(jwt_config.get_ref());
    let new_refresh_token = next.token.clone();

    let rotated = user_store
        .rotate_session(user.id, &session.token, next)
        .await
        .map_err(|e| ApiError::from_store("user_store.rotate_session", e))?;
    if !rotated {
        // A concurrent refresh or a revoke consumed the session first
        return Err(ApiError::forbidden(
            "token.refresh",
            "Invalid or expired refresh token.",
        ));
    }

    tracing::info!(
        username = %user.username,
        user_id = %user.id,
        "Refresh token rotated"
    );

    let (access, refresh) = token_cookies(&access_token, &new_refresh_token, jwt_config.get_ref());
    Ok(HttpResponse::Ok()
        .cookie(access)
        .cookie(refresh)
        .json(CredentialsResponse {
            access_token,
            refresh_token: new_refresh_token,
        }))
}

/// DELETE /api/token/revoke
///
/// Clears the caller's stored refresh session. Restricted to the Admin
/// role; the caller acts on their own account. Claims are injected by the
/// JWT middleware, so the access token must still be live here.
///
/// # Errors
/// - 401: Missing or invalid access token (handled by middleware)
/// - 403: Caller is not an Admin
/// - 404: Account no longer exists
/// - 500: Revocation could not be persisted
pub async fn revoke_token(
    claims: web::ReqData<Claims>,
    user_store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, ApiError> {
    if claims.role != "Admin" {
        return Err(ApiError::forbidden("token.revoke", "Admin role required."));
    }

    let user = user_store
        .find_by_username(&claims.sub)
        .await
        .map_err(|e| ApiError::internal("user_store.find_by_username", e))?
        .ok_or_else(|| ApiError::not_found("user_store.find_by_username", "User not found."))?;

    // Token and expiry are cleared together
    user_store
        .update_session(user.id, None)
        .await
        .map_err(|e| ApiError::from_store("user_store.update_session", e))?;

    tracing::info!(
        username = %user.username,
        user_id = %user.id,
        "Refresh session revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}

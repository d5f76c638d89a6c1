/// Friendship Routes
///
/// POST starts a pending relationship, PATCH moves it through the state
/// machine (accept with FRIENDS, block with BLOCKED) and DELETE removes it.
/// Every mutation writes both directed rows of the pair together.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::FriendshipStatus;
use crate::store::{FriendshipStore, StoreError, UserStore};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFriendshipRequest {
    pub requester_id: String,
    pub requestee_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFriendshipRequest {
    pub user_a_id: String,
    pub user_b_id: String,
    pub status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndFriendshipRequest {
    pub user_a_id: String,
    pub user_b_id: String,
}

fn parse_account_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(field, "Must be a valid account id."))
}

/// POST /api/user/friend
///
/// Starts a pending friendship between two distinct existing accounts.
///
/// # Errors
/// - 400: Malformed id, self-friendship, or the pair already has a relationship
/// - 404: Either account does not exist
/// - 500: The pair could not be written
pub async fn start_friendship(
    body: web::Json<StartFriendshipRequest>,
    user_store: web::Data<dyn UserStore>,
    friendship_store: web::Data<dyn FriendshipStore>,
) -> Result<HttpResponse, ApiError> {
    let requester = parse_account_id("requesterId", &body.requester_id)?;
    let requestee = parse_account_id("requesteeId", &body.requestee_id)?;

    if requester == requestee {
        return Err(ApiError::validation(
            "requesteeId",
            "An account cannot befriend itself.",
        ));
    }

    for (field, id) in [("requesterId", requester), ("requesteeId", requestee)] {
        let found = user_store
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::internal("user_store.find_by_id", e))?;
        if found.is_none() {
            return Err(ApiError::not_found(field, "User not found."));
        }
    }

    let existing = friendship_store
        .get(requester, requestee)
        .await
        .map_err(|e| ApiError::internal("friendship_store.get", e))?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "friendship_store.create",
            "Friendship already exists.",
        ));
    }

    if let Err(e) = friendship_store.create(requester, requestee).await {
        return Err(match e {
            // Two racing creates can both pass the lookup above; the
            // direction uniqueness constraint catches the loser.
            StoreError::Duplicate(_) => {
                ApiError::conflict("friendship_store.create", "Friendship already exists.")
            }
            other => ApiError::from_store("friendship_store.create", other),
        });
    }

    tracing::info!(
        requester_id = %requester,
        requestee_id = %requestee,
        "Friendship requested"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/user/friend
///
/// Sets a new status on an existing relationship, on both directed rows.
///
/// # Errors
/// - 400: Malformed id or unknown status
/// - 404: The pair does not resolve to a relationship
/// - 500: The pair could not be written
pub async fn update_friendship(
    body: web::Json<UpdateFriendshipRequest>,
    friendship_store: web::Data<dyn FriendshipStore>,
) -> Result<HttpResponse, ApiError> {
    let a = parse_account_id("userAId", &body.user_a_id)?;
    let b = parse_account_id("userBId", &body.user_b_id)?;
    let status = FriendshipStatus::parse(&body.status).ok_or_else(|| {
        ApiError::validation("status", "Status must be one of PENDING, FRIENDS or BLOCKED.")
    })?;

    let updated = friendship_store
        .update(a, b, status)
        .await
        .map_err(|e| ApiError::from_store("friendship_store.update", e))?;
    if !updated {
        return Err(ApiError::not_found(
            "friendship_store.update",
            "Friendship not found.",
        ));
    }

    tracing::info!(user_a_id = %a, user_b_id = %b, status = %status, "Friendship updated");

    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/user/friend
///
/// Removes both directed rows of a relationship.
///
/// # Errors
/// - 400: Malformed id
/// - 404: The pair does not resolve to a relationship
/// - 500: The pair could not be removed
pub async fn end_friendship(
    body: web::Json<EndFriendshipRequest>,
    friendship_store: web::Data<dyn FriendshipStore>,
) -> Result<HttpResponse, ApiError> {
    let a = parse_account_id("userAId", &body.user_a_id)?;
    let b = parse_account_id("userBId", &body.user_b_id)?;

    let deleted = friendship_store
        .delete(a, b)
        .await
        .map_err(|e| ApiError::from_store("friendship_store.delete", e))?;
    if !deleted {
        return Err(ApiError::not_found(
            "friendship_store.delete",
            "Friendship not found.",
        ));
    }

    tracing::info!(user_a_id = %a, user_b_id = %b, "Friendship removed");

    Ok(HttpResponse::NoContent().finish())
}

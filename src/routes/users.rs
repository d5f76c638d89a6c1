/// User Listing Route

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::FriendshipStatus;
use crate::store::{FriendshipStore, UserStore};

/// Account information with the usernames it is friends with
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub about: String,
    pub date_created: String,
    pub date_modified: String,
    pub friends: Vec<String>,
}

/// GET /api/user
///
/// Lists every account together with its accepted friendships. The
/// friends of an account are the subjects it points at with status
/// Friends; the mirrored rows mean each side sees the other listed.
///
/// # Errors
/// - 401: Missing or invalid access token (handled by middleware)
/// - 500: Store lookup failed
pub async fn get_users(
    user_store: web::Data<dyn UserStore>,
    friendship_store: web::Data<dyn FriendshipStore>,
) -> Result<HttpResponse, ApiError> {
    let users = user_store
        .list()
        .await
        .map_err(|e| ApiError::internal("user_store.list", e))?;
    let edges = friendship_store
        .edges_with_status(FriendshipStatus::Friends)
        .await
        .map_err(|e| ApiError::internal("friendship_store.edges_with_status", e))?;

    // One pass over the edges; usernames come from the list already fetched
    let usernames: HashMap<Uuid, &str> = users
        .iter()
        .map(|u| (u.id, u.username.as_str()))
        .collect();

    let mut friends_of: HashMap<Uuid, Vec<String>> = HashMap::new();
    for edge in &edges {
        if let (Some(subject), Some(object)) = (edge.user_a_id, edge.user_b_id) {
            if let Some(name) = usernames.get(&object) {
                friends_of.entry(subject).or_default().push(name.to_string());
            }
        }
    }

    let body: Vec<UserResponse> = users
        .iter()
        .map(|user| {
            let mut friends = friends_of.remove(&user.id).unwrap_or_default();
            friends.sort();
            UserResponse {
                user_id: user.id.to_string(),
                user_name: user.username.clone(),
                email: user.email.clone(),
                about: user.about.clone(),
                date_created: user.created_at.to_rfc3339(),
                date_modified: user.modified_at.to_rfc3339(),
                friends,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

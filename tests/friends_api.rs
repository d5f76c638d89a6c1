//! End-to-end tests for the friendship state machine and the user listing.

use std::net::TcpListener;
use std::sync::Arc;

use parley::configuration::JwtSettings;
use parley::model::FriendshipStatus;
use parley::startup::run;
use parley::store::{FriendshipStore, InMemoryFriendshipStore, InMemoryUserStore, UserStore};
use serde_json::{json, Value};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub user_store: Arc<InMemoryUserStore>,
    pub friendship_store: Arc<InMemoryFriendshipStore>,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let user_store = Arc::new(InMemoryUserStore::new());
    let friendship_store = Arc::new(InMemoryFriendshipStore::new());

    let jwt_config = JwtSettings {
        secret: "end-to-end-test-secret-0123456789-0123456789-0123456789".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 86400,
        issuer: "parley-test".to_string(),
        audience: "parley-clients".to_string(),
    };

    let server = run(
        listener,
        user_store.clone(),
        friendship_store.clone(),
        jwt_config,
    )
    .expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        user_store,
        friendship_store,
    }
}

/// Registers an account and returns its access token and id.
async fn register_account(
    app: &TestApp,
    client: &reqwest::Client,
    username: &str,
) -> (String, Uuid) {
    let body = json!({
        "userName": username,
        "email": format!("{}@example.com", username),
        "password": "P@ssw0rd1"
    });

    let response = client
        .post(&format!("{}/api/auth/register", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let access = body["accessToken"]
        .as_str()
        .expect("No access token")
        .to_string();

    let user = app
        .user_store
        .find_by_username(username)
        .await
        .expect("Store lookup failed")
        .expect("User was not created");

    (access, user.id)
}

fn auth_cookie(access: &str) -> (reqwest::header::HeaderName, String) {
    (reqwest::header::COOKIE, format!("Access={}", access))
}

async fn start_friendship(
    app: &TestApp,
    client: &reqwest::Client,
    access: &str,
    requester: Uuid,
    requestee: Uuid,
) -> reqwest::Response {
    let (header, value) = auth_cookie(access);
    client
        .post(&format!("{}/api/user/friend", &app.address))
        .header(header, value)
        .json(&json!({
            "requesterId": requester.to_string(),
            "requesteeId": requestee.to_string()
        }))
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn update_friendship(
    app: &TestApp,
    client: &reqwest::Client,
    access: &str,
    a: Uuid,
    b: Uuid,
    status: &str,
) -> reqwest::Response {
    let (header, value) = auth_cookie(access);
    client
        .patch(&format!("{}/api/user/friend", &app.address))
        .header(header, value)
        .json(&json!({
            "userAId": a.to_string(),
            "userBId": b.to_string(),
            "status": status
        }))
        .send()
        .await
        .expect("Failed to execute request.")
}

// --- Friendship Creation Tests ---

#[tokio::test]
async fn starting_a_friendship_creates_a_mirrored_pending_pair() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    let response = start_friendship(&app, &client, &access, alice, bob).await;
    assert_eq!(204, response.status().as_u16());

    let pair = app
        .friendship_store
        .get(alice, bob)
        .await
        .expect("Store lookup failed")
        .expect("No pair was written");

    assert_eq!(pair.status(), FriendshipStatus::Pending);
    assert_eq!(pair.a_to_b.user_a_id, Some(alice));
    assert_eq!(pair.a_to_b.user_b_id, Some(bob));
    assert_eq!(pair.b_to_a.user_a_id, Some(bob));
    assert_eq!(pair.b_to_a.user_b_id, Some(alice));
    assert_eq!(pair.b_to_a.status, FriendshipStatus::Pending);
}

#[tokio::test]
async fn a_second_request_for_the_same_pair_is_rejected() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (bob_access, bob) = register_account(&app, &client, "bob").await;

    let first = start_friendship(&app, &client, &access, alice, bob).await;
    assert_eq!(204, first.status().as_u16());

    // Same orientation
    let duplicate = start_friendship(&app, &client, &access, alice, bob).await;
    assert_eq!(400, duplicate.status().as_u16());
    let errors: Value = duplicate.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["friendship_store.create"][0],
        "Friendship already exists."
    );

    // Reversed orientation
    let reversed = start_friendship(&app, &client, &bob_access, bob, alice).await;
    assert_eq!(400, reversed.status().as_u16());
}

#[tokio::test]
async fn befriending_yourself_is_rejected() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;

    let response = start_friendship(&app, &client, &access, alice, alice).await;
    assert_eq!(400, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["requesteeId"][0],
        "An account cannot befriend itself."
    );
}

#[tokio::test]
async fn befriending_an_unknown_account_is_not_found() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;

    let response = start_friendship(&app, &client, &access, alice, Uuid::new_v4()).await;
    assert_eq!(404, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(errors["errors"]["requesteeId"][0], "User not found.");
}

#[tokio::test]
async fn malformed_account_ids_are_rejected() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, _) = register_account(&app, &client, "alice").await;

    let (header, value) = auth_cookie(&access);
    let response = client
        .post(&format!("{}/api/user/friend", &app.address))
        .header(header, value)
        .json(&json!({
            "requesterId": "not-a-uuid",
            "requesteeId": "also-not-a-uuid"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["requesterId"][0],
        "Must be a valid account id."
    );
}

// --- State Machine Tests ---

#[tokio::test]
async fn accepting_updates_both_rows_order_independently() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (alice_access, alice) = register_account(&app, &client, "alice").await;
    let (bob_access, bob) = register_account(&app, &client, "bob").await;

    let response = start_friendship(&app, &client, &alice_access, alice, bob).await;
    assert_eq!(204, response.status().as_u16());

    // Bob accepts, naming the pair in the opposite order
    let response = update_friendship(&app, &client, &bob_access, bob, alice, "FRIENDS").await;
    assert_eq!(204, response.status().as_u16());

    let pair = app
        .friendship_store
        .get(alice, bob)
        .await
        .expect("Store lookup failed")
        .expect("Pair disappeared");
    assert_eq!(pair.a_to_b.status, FriendshipStatus::Friends);
    assert_eq!(pair.b_to_a.status, FriendshipStatus::Friends);
}

#[tokio::test]
async fn blocking_updates_both_rows() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    start_friendship(&app, &client, &access, alice, bob).await;
    let response = update_friendship(&app, &client, &access, alice, bob, "BLOCKED").await;
    assert_eq!(204, response.status().as_u16());

    let pair = app
        .friendship_store
        .get(bob, alice)
        .await
        .expect("Store lookup failed")
        .expect("Pair disappeared");
    assert_eq!(pair.status(), FriendshipStatus::Blocked);
}

#[tokio::test]
async fn updating_an_absent_pair_is_not_found() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    let response = update_friendship(&app, &client, &access, alice, bob, "FRIENDS").await;
    assert_eq!(404, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["friendship_store.update"][0],
        "Friendship not found."
    );
}

#[tokio::test]
async fn an_unknown_status_is_rejected() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    start_friendship(&app, &client, &access, alice, bob).await;

    // Statuses are the canonical uppercase strings
    let response = update_friendship(&app, &client, &access, alice, bob, "friends").await;
    assert_eq!(400, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["status"][0],
        "Status must be one of PENDING, FRIENDS or BLOCKED."
    );
}

#[tokio::test]
async fn ending_a_friendship_removes_both_rows() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    start_friendship(&app, &client, &access, alice, bob).await;

    // End it naming the pair in the opposite order
    let (header, value) = auth_cookie(&access);
    let response = client
        .delete(&format!("{}/api/user/friend", &app.address))
        .header(header, value)
        .json(&json!({
            "userAId": bob.to_string(),
            "userBId": alice.to_string()
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    assert!(app
        .friendship_store
        .get(alice, bob)
        .await
        .expect("Store lookup failed")
        .is_none());
    assert!(app
        .friendship_store
        .get(bob, alice)
        .await
        .expect("Store lookup failed")
        .is_none());
    assert!(app
        .friendship_store
        .edges_with_status(FriendshipStatus::Pending)
        .await
        .expect("Store lookup failed")
        .is_empty());
}

#[tokio::test]
async fn ending_an_absent_friendship_is_not_found() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;

    let (header, value) = auth_cookie(&access);
    let response = client
        .delete(&format!("{}/api/user/friend", &app.address))
        .header(header, value)
        .json(&json!({
            "userAId": alice.to_string(),
            "userBId": bob.to_string()
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["friendship_store.delete"][0],
        "Friendship not found."
    );
}

#[tokio::test]
async fn friendship_routes_require_authentication() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let body = json!({
        "requesterId": Uuid::new_v4().to_string(),
        "requesteeId": Uuid::new_v4().to_string()
    });

    let url = format!("{}/api/user/friend", &app.address);
    let requests = vec![
        client.post(&url).json(&body),
        client.patch(&url).json(&body),
        client.delete(&url).json(&body),
    ];

    for request in requests {
        let response = request.send().await.expect("Failed to execute request.");
        assert_eq!(
            401,
            response.status().as_u16(),
            "A friendship mutation was allowed without credentials"
        );
    }
}

// --- User Listing Tests ---

#[tokio::test]
async fn user_listing_shows_accepted_friends_on_both_sides() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let (access, alice) = register_account(&app, &client, "alice").await;
    let (_, bob) = register_account(&app, &client, "bob").await;
    let (_, carol) = register_account(&app, &client, "carol").await;
    let (_, dave) = register_account(&app, &client, "dave").await;

    // alice <-> bob accepted, alice -> carol pending, alice <-> dave blocked
    start_friendship(&app, &client, &access, alice, bob).await;
    update_friendship(&app, &client, &access, alice, bob, "FRIENDS").await;
    start_friendship(&app, &client, &access, alice, carol).await;
    start_friendship(&app, &client, &access, alice, dave).await;
    update_friendship(&app, &client, &access, alice, dave, "BLOCKED").await;

    let (header, value) = auth_cookie(&access);
    let response = client
        .get(&format!("{}/api/user", &app.address))
        .header(header, value)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let users: Value = response.json().await.expect("Failed to parse response");
    let users = users.as_array().expect("Body is not an array");
    assert_eq!(users.len(), 4);

    let friends_of = |name: &str| -> Vec<String> {
        let entry = users
            .iter()
            .find(|u| u["userName"] == name)
            .unwrap_or_else(|| panic!("No listing entry for {}", name));
        entry["friends"]
            .as_array()
            .expect("No friends array")
            .iter()
            .map(|f| f.as_str().expect("Friend is not a string").to_string())
            .collect()
    };

    // Only accepted friendships are listed, and both sides see each other
    assert_eq!(friends_of("alice"), vec!["bob".to_string()]);
    assert_eq!(friends_of("bob"), vec!["alice".to_string()]);
    assert!(friends_of("carol").is_empty());
    assert!(friends_of("dave").is_empty());

    let alice_entry = users
        .iter()
        .find(|u| u["userName"] == "alice")
        .expect("No listing entry for alice");
    assert_eq!(alice_entry["userId"], alice.to_string());
    assert_eq!(alice_entry["email"], "alice@example.com");
    assert_eq!(alice_entry["about"], "");
    assert!(alice_entry["dateCreated"].as_str().is_some());
    assert!(alice_entry["dateModified"].as_str().is_some());
}

#[tokio::test]
async fn user_listing_requires_authentication() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/user", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());

    let errors: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        errors["errors"]["auth.credentials"][0],
        "Missing access token."
    );
}

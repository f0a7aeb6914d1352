// End-to-end API tests: the full router served over a real socket, driven
// through an HTTP client, with the in-memory repository behind it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use shoplist_api::auth;
use shoplist_api::models::{Role, RoleSet, User};
use shoplist_api::{AppConfig, AppState, MemoryRepository, create_router};

// --- Test server setup ---

async fn spawn_app() -> (String, reqwest::Client, Arc<MemoryRepository>) {
    let mem = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: mem.clone(),
        config: AppConfig::default(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind an ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), reqwest::Client::new(), mem)
}

fn seed_admin(mem: &MemoryRepository, password: &str) -> User {
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        full_name: "Site Admin".to_string(),
        email: "admin@example.com".to_string(),
        password_hash: auth::hash_password(password).unwrap(),
        roles: RoleSet::new(vec![Role::Admin]),
        active: true,
        last_updated_by: None,
        created_at: now,
        updated_at: now,
    };
    mem.insert_user(admin.clone());
    admin
}

async fn signup(client: &reqwest::Client, base: &str, email: &str) -> (String, Value) {
    let response = client
        .post(format!("{}/auth/signup", base))
        .json(&json!({
            "full_name": format!("User {}", email),
            "email": email,
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    (token, body["user"].clone())
}

// --- Tests ---

#[tokio::test]
async fn test_health_endpoint() {
    let (base, client, _mem) = spawn_app().await;

    let response = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    // Every response carries a correlation id.
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let (base, client, _mem) = spawn_app().await;

    let response = client.get(format!("{}/items", base)).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_shopping_flow_end_to_end() {
    let (base, client, _mem) = spawn_app().await;
    let (token, _user) = signup(&client, &base, "alice@example.com").await;

    // Create a catalog item.
    let item: Value = client
        .post(format!("{}/items", base))
        .bearer_auth(&token)
        .json(&json!({"name": "Milk", "quantity_units": "liters"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item_id = item["id"].as_str().unwrap();

    // Create a list.
    let list: Value = client
        .post(format!("{}/lists", base))
        .bearer_auth(&token)
        .json(&json!({"name": "Groceries"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list_id = list["id"].as_str().unwrap();

    // Put the item on the list.
    let response = client
        .post(format!("{}/list-items", base))
        .bearer_auth(&token)
        .json(&json!({"list_id": list_id, "item_id": item_id, "quantity": 2.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // A second membership of the same pair is a conflict.
    let response = client
        .post(format!("{}/list-items", base))
        .bearer_auth(&token)
        .json(&json!({"list_id": list_id, "item_id": item_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "CONFLICT");

    // The list view joins in the item name.
    let rows: Value = client
        .get(format!("{}/lists/{}/items", base, list_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["item_name"], "Milk");
    assert_eq!(rows[0]["quantity"], 2.0);

    // The list detail reports its membership count.
    let detail: Value = client
        .get(format!("{}/lists/{}", base, list_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["total_items"], 1);
    assert_eq!(detail["list"]["name"], "Groceries");
}

#[tokio::test]
async fn test_users_cannot_reach_each_others_records() {
    let (base, client, _mem) = spawn_app().await;
    let (alice_token, _) = signup(&client, &base, "alice@example.com").await;
    let (bob_token, _) = signup(&client, &base, "bob@example.com").await;

    let item: Value = client
        .post(format!("{}/items", base))
        .bearer_auth(&alice_token)
        .json(&json!({"name": "Milk"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item_id = item["id"].as_str().unwrap();

    // Bob's lookup, update, and delete of Alice's item all 404.
    let lookup = client
        .get(format!("{}/items/{}", base, item_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(lookup.status(), 404);
    let body: Value = lookup.json().await.unwrap();
    assert_eq!(body["error"], "NOT_FOUND");

    let delete = client
        .delete(format!("{}/items/{}", base, item_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 404);

    // Bob's own listing does not include it either.
    let items: Value = client
        .get(format!("{}/items", base))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let (base, client, _mem) = spawn_app().await;
    signup(&client, &base, "alice@example.com").await;

    let response = client
        .post(format!("{}/auth/signup", base))
        .json(&json!({
            "full_name": "Alice Again",
            "email": "alice@example.com",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_admin_block_invalidates_outstanding_tokens() {
    let (base, client, mem) = spawn_app().await;
    let (user_token, user) = signup(&client, &base, "alice@example.com").await;
    let user_id = user["id"].as_str().unwrap();
    seed_admin(&mem, "admin-password");

    let admin_login: Value = client
        .post(format!("{}/auth/login", base))
        .json(&json!({"email": "admin@example.com", "password": "admin-password"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let admin_token = admin_login["token"].as_str().unwrap();

    // The user's token works before the block.
    let before = client
        .get(format!("{}/me", base))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(before.status(), 200);

    let block = client
        .patch(format!("{}/admin/users/{}/block", base, user_id))
        .bearer_auth(admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(block.status(), 200);
    let blocked: Value = block.json().await.unwrap();
    assert_eq!(blocked["active"], false);

    // The same token stops validating immediately.
    let after = client
        .get(format!("{}/me", base))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 401);
}

#[tokio::test]
async fn test_admin_routes_reject_plain_users() {
    let (base, client, _mem) = spawn_app().await;
    let (token, _) = signup(&client, &base, "alice@example.com").await;

    let response = client
        .get(format!("{}/admin/users", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_pagination_and_search_over_the_wire() {
    let (base, client, _mem) = spawn_app().await;
    let (token, _) = signup(&client, &base, "alice@example.com").await;

    for name in ["Milk", "Almond Milk", "Bread", "Butter"] {
        let response = client
            .post(format!("{}/items", base))
            .bearer_auth(&token)
            .json(&json!({"name": name}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let hits: Value = client
        .get(format!("{}/items?search=milk", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let second_page: Value = client
        .get(format!("{}/items?limit=3&offset=3", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second_page = second_page.as_array().unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0]["name"], "Butter");
}

mod common;

use reqwest::StatusCode;
use serde_json::json;

use common::{json_body, spawn_app};

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;
    let farmer = app.register_farmer("maria").await;
    assert!(!farmer.token.is_empty());

    for login in ["maria", "maria@farm.test"] {
        let response = app
            .client
            .post(app.url("/login"))
            .json(&json!({ "email_or_username": login, "password": "Muzion15" }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["role"], "farmer");
        assert_eq!(body["user"]["user_id"], farmer.user_id);
        assert!(body["access_token"].as_str().is_some());
        assert!(body["user"].get("password_hash").is_none());
    }
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = spawn_app().await;
    app.register_buyer("tom").await;

    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "email_or_username": "tom", "password": "nope-nope" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register_buyer("tom").await;

    let response = app
        .client
        .post(app.url("/register_buyer"))
        .json(&json!({
            "email": "tom@buyer.test",
            "password": "Muzion15",
            "first_name": "Tom",
            "last_name": "Again"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(response).await["error"],
        "Email is already registered"
    );
}

#[tokio::test]
async fn test_register_requires_fields() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/register_farmer"))
        .json(&json!({
            "email": "no-farm@farm.test",
            "password": "Muzion15",
            "first_name": "No",
            "last_name": "Farm"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url("/register_buyer"))
        .json(&json!({
            "email": "not-an-email",
            "password": "Muzion15",
            "first_name": "Bad",
            "last_name": "Email"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/profile"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get("/profile", "not.a.token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_is_for_buyers_only() {
    let app = spawn_app().await;
    let farmer = app.register_farmer("maria").await;
    let buyer = app.register_buyer("tom").await;

    let response = app
        .get("/cart", &farmer.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get("/cart", &buyer.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_updates() {
    let app = spawn_app().await;
    let farmer = app.register_farmer("maria").await;
    let buyer = app.register_buyer("tom").await;

    let response = app
        .get("/profile", &farmer.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["username"], "maria");
    assert_eq!(body["farm_name"], "maria fields");

    let response = app
        .put("/profile", &buyer.token)
        .json(&json!({ "username": "maria" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .put("/farm", &farmer.token)
        .json(&json!({ "farm_size": 12.5, "crops_grown": "kale, leeks" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["farm"]["farm_size"], 12.5);

    let response = app
        .put("/farm", &buyer.token)
        .json(&json!({ "farm_name": "Nope" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put("/delivery_preferences", &buyer.token)
        .json(&json!({ "default_delivery_address": "3 Mill Road" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["preferences"]["default_delivery_address"],
        "3 Mill Road"
    );
}

#![allow(dead_code)]

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use farm_market::entities::setup_schema;
use farm_market::middleware::auth::TokenKeys;

pub struct TestApp {
    pub address: String,
    pub client: Client,
}

pub struct Account {
    pub token: String,
    pub user_id: i64,
}

/// Starts the router on an ephemeral port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    // One connection: every in-memory connection is its own database.
    let db = farm_market::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");

    let keys = Arc::new(TokenKeys::new("integration-test-secret", 1));
    let app = farm_market::app(Arc::new(db), keys);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        address: format!("http://{addr}"),
        client: Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    async fn register(&self, path: &str, payload: Value) -> Account {
        let response = self
            .client
            .post(self.url(path))
            .json(&payload)
            .send()
            .await
            .expect("Failed to send register request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        Account {
            token: body["access_token"]
                .as_str()
                .expect("Token not found in register response")
                .to_owned(),
            user_id: body["user_id"].as_i64().expect("user_id missing"),
        }
    }

    pub async fn register_farmer(&self, name: &str) -> Account {
        self.register(
            "/register_farmer",
            json!({
                "email": format!("{name}@farm.test"),
                "username": name,
                "password": "Muzion15",
                "first_name": name,
                "last_name": "Grower",
                "farm_name": format!("{name} fields")
            }),
        )
        .await
    }

    pub async fn register_buyer(&self, name: &str) -> Account {
        self.register(
            "/register_buyer",
            json!({
                "email": format!("{name}@buyer.test"),
                "username": name,
                "password": "Muzion15",
                "first_name": name,
                "last_name": "Shopper",
                "default_delivery_address": "12 Orchard Lane",
                "preferred_payment_method": "card"
            }),
        )
        .await
    }

    /// Creates a product and returns its id.
    pub async fn create_product(&self, farmer: &Account, name: &str, price: &str, qty: i32) -> i64 {
        let response = self
            .post("/products", &farmer.token)
            .json(&json!({
                "name": name,
                "category_name": "Produce",
                "price": price,
                "quantity_available": qty,
                "quantity_unit": "kg"
            }))
            .send()
            .await
            .expect("Failed to send create product request");
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["product_id"]
            .as_i64()
            .expect("product_id missing")
    }

    pub async fn add_to_cart(&self, buyer: &Account, product_id: i64, quantity: i32) -> StatusCode {
        self.post("/cart/items", &buyer.token)
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .send()
            .await
            .expect("Failed to send add to cart request")
            .status()
    }

    pub async fn product(&self, product_id: i64) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(&format!("/products/{product_id}")))
            .send()
            .await
            .expect("Failed to send get product request");
        let status = response.status();
        (status, json_body(response).await)
    }
}

pub async fn json_body(response: reqwest::Response) -> Value {
    response
        .json::<Value>()
        .await
        .expect("Failed to parse response JSON")
}

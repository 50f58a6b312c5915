mod common;

use reqwest::StatusCode;
use serde_json::json;

use common::{json_body, spawn_app, Account, TestApp};

async fn make_offer(app: &TestApp, buyer: &Account, product_id: i64, price: f64) -> i64 {
    let response = app
        .post("/offers", &buyer.token)
        .json(&json!({ "product_id": product_id, "offer_price": price }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["offer_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_counter_offer_flow_ends_in_an_order_at_the_agreed_price() {
    let app = spawn_app().await;
    let farmer = app.register_farmer("maria").await;
    let buyer = app.register_buyer("tom").await;
    let product_id = app.create_product(&farmer, "Honey", "10.00", 5).await;

    let offer_id = make_offer(&app, &buyer, product_id, 8.0).await;

    let response = app
        .put(&format!("/offers/{offer_id}"), &farmer.token)
        .json(&json!({ "action": "counter", "counter_price": 9.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Offer countered successfully");

    let response = app
        .put(&format!("/offers/{offer_id}/buyer_response"), &buyer.token)
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(app.get("/offers", &buyer.token).send().await.unwrap()).await;
    assert_eq!(body["offers"][0]["status"], "accepted");
    assert_eq!(body["offers"][0]["offer_price"], "9.00");
    assert_eq!(body["offers"][0]["product_name"], "Honey");

    let response = app
        .post("/orders", &buyer.token)
        .json(&json!({ "offer_id": offer_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order_id = json_body(response).await["order_id"].as_i64().unwrap();

    let detail = json_body(
        app.get(&format!("/orders/{order_id}"), &buyer.token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["total_amount"], "9.00");
    assert_eq!(detail["items"][0]["price"], "9.00");
    assert_eq!(detail["items"][0]["quantity"], 1);
    assert_eq!(detail["offer_id"], offer_id);

    // An offer pays for one order only.
    let response = app
        .post("/orders", &buyer.token)
        .json(&json!({ "offer_id": offer_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_offer_permissions_and_states() {
    let app = spawn_app().await;
    let farmer = app.register_farmer("maria").await;
    let rival = app.register_farmer("olga").await;
    let buyer = app.register_buyer("tom").await;
    let product_id = app.create_product(&farmer, "Cider", "6.00", 5).await;

    let response = app
        .post("/offers", &farmer.token)
        .json(&json!({ "product_id": product_id, "offer_price": 5.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let offer_id = make_offer(&app, &buyer, product_id, 5.0).await;
    let farmer_path = format!("/offers/{offer_id}");
    let buyer_path = format!("/offers/{offer_id}/buyer_response");

    // The buyer cannot answer their own pending offer.
    let response = app
        .put(&buyer_path, &buyer.token)
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&farmer_path, &rival.token)
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put(&farmer_path, &farmer.token)
        .json(&json!({ "action": "haggle" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&farmer_path, &farmer.token)
        .json(&json!({ "action": "counter" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&farmer_path, &farmer.token)
        .json(&json!({ "action": "reject" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Rejected is final.
    let response = app
        .put(&farmer_path, &farmer.token)
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/orders", &buyer.token)
        .json(&json!({ "offer_id": offer_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid or unaccepted offer"
    );

    let farmer_view = json_body(app.get("/offers", &farmer.token).send().await.unwrap()).await;
    assert_eq!(farmer_view["offers"].as_array().unwrap().len(), 1);
    let rival_view = json_body(app.get("/offers", &rival.token).send().await.unwrap()).await;
    assert_eq!(rival_view["offers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_offer_on_missing_product() {
    let app = spawn_app().await;
    let buyer = app.register_buyer("tom").await;

    let response = app
        .post("/offers", &buyer.token)
        .json(&json!({ "product_id": 4242, "offer_price": 1.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Checkout: order placement, stock accounting and order lookup.

use axum::http::{Method, StatusCode};
use serde_json::json;

use pola_core::SessionId;
use pola_integration_tests::{TestApp, checkout_body, decimal, id_of};

async fn checkout(app: &TestApp, session: &SessionId) -> pola_integration_tests::TestResponse {
    app.send_as(session, Method::POST, "/api/checkout", Some(checkout_body()))
        .await
}

async fn stock_of(app: &TestApp, product: i64) -> i64 {
    app.send(Method::GET, &format!("/api/products/{product}"), None)
        .await
        .body["stockQuantity"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_checkout_places_order() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 10).await);
    let motor = id_of(&app.create_product("Motor", "Motors", "5.00", 10).await);
    app.add_to_cart(&session, frame, 2).await;
    app.add_to_cart(&session, motor, 1).await;

    let placed = checkout(&app, &session).await;
    assert_eq!(placed.status, StatusCode::CREATED);

    let order = &placed.body;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["customerName"], "Ada Lovelace");
    assert_eq!(order["customerEmail"], "ada@example.com");
    assert_eq!(order["sessionId"], session.as_str());
    assert_eq!(decimal(&order["total"]), decimal(&json!("25.00")));

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let frame_item = items.iter().find(|i| i["productId"] == frame).unwrap();
    assert_eq!(frame_item["productName"], "Frame");
    assert_eq!(frame_item["quantity"], 2);
    assert_eq!(decimal(&frame_item["price"]), decimal(&json!("10.00")));
    assert_eq!(decimal(&frame_item["total"]), decimal(&json!("20.00")));

    // Stock is decremented and the cart emptied
    assert_eq!(stock_of(&app, frame).await, 8);
    assert_eq!(stock_of(&app, motor).await, 9);
    let cart = app.send_as(&session, Method::GET, "/api/cart", None).await;
    assert_eq!(cart.body["items"], json!([]));
}

#[tokio::test]
async fn test_order_number_format() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 10).await);
    app.add_to_cart(&session, frame, 1).await;

    let placed = checkout(&app, &session).await;
    let number = placed.body["orderNumber"].as_str().unwrap();

    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3, "{number}");
    assert_eq!(parts[0], "POLA");
    assert!(parts[1].len() >= 13 && parts[1].bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(parts[2].len(), 3);
    assert!(parts[2].bytes().all(|b| b.is_ascii_digit()));
}

#[tokio::test]
async fn test_checkout_empty_cart_is_rejected() {
    let app = TestApp::new();
    let session = SessionId::generate();

    let response = checkout(&app, &session).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Cart is empty");
}

#[tokio::test]
async fn test_checkout_validates_customer_details() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 10).await);
    app.add_to_cart(&session, frame, 1).await;

    let bad_email = app
        .send_as(
            &session,
            Method::POST,
            "/api/checkout",
            Some(json!({
                "customerName": "Ada",
                "customerEmail": "not-an-email",
                "shippingAddress": "12 Analytical Way",
            })),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let blank_name = app
        .send_as(
            &session,
            Method::POST,
            "/api/checkout",
            Some(json!({
                "customerName": "   ",
                "customerEmail": "ada@example.com",
                "shippingAddress": "12 Analytical Way",
            })),
        )
        .await;
    assert_eq!(blank_name.status, StatusCode::BAD_REQUEST);

    let missing = app
        .send_as(&session, Method::POST, "/api/checkout", Some(json!({})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    // Nothing was consumed
    assert_eq!(stock_of(&app, frame).await, 10);
}

#[tokio::test]
async fn test_checkout_rejects_quantity_above_stock() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 5).await);
    app.add_to_cart(&session, frame, 5).await;

    // Stock drops after the item went into the cart
    app.send(
        Method::PUT,
        &format!("/api/products/{frame}"),
        Some(json!({ "stockQuantity": 2 })),
    )
    .await;

    let response = checkout(&app, &session).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Insufficient stock for product: Frame"
    );

    assert_eq!(stock_of(&app, frame).await, 2);
    let cart = app.send_as(&session, Method::GET, "/api/cart", None).await;
    assert_eq!(cart.body["itemCount"], 5);
}

#[tokio::test]
async fn test_concurrent_checkout_of_last_unit() {
    let app = TestApp::new();
    let alice = SessionId::generate();
    let bob = SessionId::generate();
    let drone = id_of(&app.create_product("Last Drone", "Drones", "999.00", 1).await);
    app.add_to_cart(&alice, drone, 1).await;
    app.add_to_cart(&bob, drone, 1).await;

    let (a, b) = tokio::join!(checkout(&app, &alice), checkout(&app, &bob));

    let mut statuses = [a.status, b.status];
    statuses.sort_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    assert_eq!(stock_of(&app, drone).await, 0);
}

#[tokio::test]
async fn test_order_lookup() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 10).await);
    app.add_to_cart(&session, frame, 1).await;
    let placed = checkout(&app, &session).await;
    let number = placed.body["orderNumber"].as_str().unwrap();

    let found = app
        .send(Method::GET, &format!("/api/checkout/orders/{number}"), None)
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["id"], placed.body["id"]);

    let missing = app
        .send(Method::GET, "/api/checkout/orders/POLA-0-000", None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(
        missing.body["message"],
        "Order with number POLA-0-000 not found"
    );
}

#[tokio::test]
async fn test_session_order_history_newest_first() {
    let app = TestApp::new();
    let session = SessionId::generate();
    let other = SessionId::generate();
    let frame = id_of(&app.create_product("Frame", "Frames", "10.00", 10).await);

    app.add_to_cart(&session, frame, 1).await;
    let first = checkout(&app, &session).await;
    app.add_to_cart(&session, frame, 2).await;
    let second = checkout(&app, &session).await;

    let orders = app
        .send_as(&session, Method::GET, "/api/checkout/orders", None)
        .await;
    assert_eq!(orders.status, StatusCode::OK);
    let list = orders.body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["orderNumber"], second.body["orderNumber"]);
    assert_eq!(list[1]["orderNumber"], first.body["orderNumber"]);

    let others = app
        .send_as(&other, Method::GET, "/api/checkout/orders", None)
        .await;
    assert_eq!(others.body, json!([]));
}

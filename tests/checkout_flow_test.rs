//! Gateway checkout and payment verification over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, TEST_KEY_ID};
use serde_json::{json, Value};
use storefront_api::services::payments::{GatewayFailure, GatewayOrder};

fn checkout_body() -> Value {
    json!({
        "items": [{ "productId": "p1", "size": "M", "quantity": 2, "price": 500 }],
        "amount": 1000.00,
        "address": { "firstName": "Asha", "city": "Pune", "zipcode": "411001" }
    })
}

async fn order_count(app: &TestApp) -> usize {
    let admin = app.admin_token();
    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await["data"]
        .as_array()
        .map(Vec::len)
        .unwrap_or_default()
}

#[tokio::test]
async fn buyer_checkout_then_verify_marks_order_paid_and_empties_cart() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-1");

    let cart = app
        .request(
            Method::PUT,
            "/api/v1/cart",
            Some(json!({ "cartData": { "p1": { "M": 2 } } })),
            Some(&token),
        )
        .await;
    assert_eq!(cart.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let checkout = &body["data"];
    assert_eq!(checkout["amount"], 100_000);
    assert_eq!(checkout["currency"], "INR");
    assert_eq!(checkout["key"], TEST_KEY_ID);
    let remote_id = checkout["id"].as_str().unwrap().to_string();
    let receipt = checkout["receipt"].as_str().unwrap().to_string();

    let created = app.gateway.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].receipt, receipt);
    assert_eq!(created[0].notes.user_id, "buyer-1");

    let signature = app.sign(&remote_id, "pay_001");
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(json!({
                "razorpay_order_id": remote_id,
                "razorpay_payment_id": "pay_001",
                "razorpay_signature": signature,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Payment Successful");
    assert_eq!(body["data"]["orderId"], receipt.as_str());
    assert_eq!(body["data"]["alreadyVerified"], false);

    let mine = app
        .request(Method::GET, "/api/v1/orders/mine", None, Some(&token))
        .await;
    let orders = response_json(mine).await["data"].clone();
    let order = &orders[0];
    assert_eq!(order["id"], receipt.as_str());
    assert_eq!(order["payment"], true);
    assert_eq!(order["status"], "Paid");
    assert_eq!(order["paymentMethod"], "Razorpay");
    assert_eq!(order["gatewayOrderId"], remote_id.as_str());
    assert_eq!(order["gatewayPaymentId"], "pay_001");
    assert!(order["paymentVerifiedAt"].is_string());

    let cart = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response_json(cart).await["data"]["cartData"], json!({}));
}

#[tokio::test]
async fn repeated_verification_is_idempotent() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-2");

    let body = response_json(
        app.request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await,
    )
    .await;
    let remote_id = body["data"]["id"].as_str().unwrap().to_string();
    let notification = json!({
        "razorpay_order_id": remote_id,
        "razorpay_payment_id": "pay_002",
        "razorpay_signature": app.sign(&remote_id, "pay_002"),
    });

    let first = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(notification.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(notification),
            Some(&token),
        )
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(response_json(second).await["data"]["alreadyVerified"], true);
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_touching_the_order() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-3");

    let body = response_json(
        app.request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await,
    )
    .await;
    let remote_id = body["data"]["id"].as_str().unwrap().to_string();
    let mut signature = app.sign(&remote_id, "pay_003");
    let last = if signature.ends_with('0') { "1" } else { "0" };
    signature.replace_range(signature.len() - 1.., last);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(json!({
                "razorpay_order_id": remote_id,
                "razorpay_payment_id": "pay_003",
                "razorpay_signature": signature,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = response_json(response).await;
    assert_eq!(error["message"], "Payment verification failed");
    assert!(!error.to_string().contains(&app.sign(&remote_id, "pay_003")));

    let mine = response_json(
        app.request(Method::GET, "/api/v1/orders/mine", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(mine["data"][0]["payment"], false);
}

#[tokio::test]
async fn gateway_amount_mismatch_leaves_order_unpaid() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-4");

    let body = response_json(
        app.request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await,
    )
    .await;
    let remote_id = body["data"]["id"].as_str().unwrap().to_string();
    let receipt = body["data"]["receipt"].as_str().unwrap().to_string();
    app.gateway.put_order(GatewayOrder {
        id: remote_id.clone(),
        amount: 100,
        currency: "INR".to_string(),
        receipt: Some(receipt),
        status: Some("paid".to_string()),
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(json!({
                "razorpay_order_id": remote_id,
                "razorpay_payment_id": "pay_004",
                "razorpay_signature": app.sign(&remote_id, "pay_004"),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mine = response_json(
        app.request(Method::GET, "/api/v1/orders/mine", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(mine["data"][0]["payment"], false);
}

#[tokio::test]
async fn gateway_rejection_rolls_back_the_pending_order() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-5");
    app.gateway.fail_create_with(GatewayFailure::Rejected {
        status: 401,
        code: Some("BAD_REQUEST_ERROR".to_string()),
        description: "Authentication failed".to_string(),
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = response_json(response).await;
    assert_eq!(error["message"], "Failed to create payment order");
    assert_eq!(error["details"], "Authentication failed");
    assert_eq!(error["mode"], "test");

    assert_eq!(order_count(&app).await, 0);
}

#[tokio::test]
async fn missing_credentials_fail_checkout_without_leaving_an_order() {
    let app = TestApp::without_credentials().await;
    let token = app.buyer_token("buyer-6");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = response_json(response).await;
    assert_eq!(error["message"], "Payment configuration missing");
    assert!(app.gateway.created().is_empty());
    assert_eq!(order_count(&app).await, 0);
}

#[tokio::test]
async fn invalid_checkout_input_is_rejected_before_persisting() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-7");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(json!({ "items": [], "amount": 0, "address": {} })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.gateway.created().is_empty());
    assert_eq!(order_count(&app).await, 0);
}

#[tokio::test]
async fn gateway_outage_during_verification_is_retryable() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-8");

    let body = response_json(
        app.request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await,
    )
    .await;
    let remote_id = body["data"]["id"].as_str().unwrap().to_string();
    app.gateway.fail_fetch_with(GatewayFailure::Timeout);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(json!({
                "razorpay_order_id": remote_id,
                "razorpay_payment_id": "pay_008",
                "razorpay_signature": app.sign(&remote_id, "pay_008"),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let mine = response_json(
        app.request(Method::GET, "/api/v1/orders/mine", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(mine["data"][0]["payment"], false);
}

#[tokio::test]
async fn guest_checkout_and_verification_need_no_session() {
    let app = TestApp::new().await;

    let mut body = checkout_body();
    body["guestId"] = json!("sess-42");
    let response = app
        .request(Method::POST, "/api/v1/orders/razorpay/guest", Some(body), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let checkout = response_json(response).await["data"].clone();
    let remote_id = checkout["id"].as_str().unwrap().to_string();
    assert_eq!(app.gateway.created()[0].notes.user_id, "guest:sess-42");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/guest/verify",
            Some(json!({
                "guestId": "sess-42",
                "razorpay_order_id": remote_id,
                "razorpay_payment_id": "pay_guest",
                "razorpay_signature": app.sign(&remote_id, "pay_guest"),
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let confirmation = response_json(response).await;
    assert_eq!(confirmation["data"]["orderId"], checkout["receipt"]);

    let admin = app.admin_token();
    let all = response_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&admin))
            .await,
    )
    .await;
    assert_eq!(all["data"][0]["userId"], "guest:sess-42");
    assert_eq!(all["data"][0]["payment"], true);
}

#[tokio::test]
async fn verification_requires_all_gateway_fields() {
    let app = TestApp::new().await;
    let token = app.buyer_token("buyer-9");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay/verify",
            Some(json!({ "razorpay_order_id": "order_x" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_timeout_mid_checkout_does_not_orphan_the_order() {
    let app = TestApp::with_request_timeout(1).await;
    let token = app.buyer_token("buyer-10");
    app.gateway.delay_create_by(std::time::Duration::from_secs(2));
    app.gateway.fail_create_with(GatewayFailure::Rejected {
        status: 400,
        code: Some("BAD_REQUEST_ERROR".to_string()),
        description: "Order amount less than minimum amount allowed".to_string(),
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    // The checkout keeps running after the response and rolls its order back.
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    assert_eq!(app.gateway.created().len(), 1);
    assert_eq!(order_count(&app).await, 0);
}

#[tokio::test]
async fn request_timeout_mid_checkout_still_links_a_successful_order() {
    let app = TestApp::with_request_timeout(1).await;
    let token = app.buyer_token("buyer-11");
    app.gateway.delay_create_by(std::time::Duration::from_secs(2));

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/razorpay",
            Some(checkout_body()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    let admin = app.admin_token();
    let all = response_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&admin))
            .await,
    )
    .await;
    assert_eq!(all["data"].as_array().unwrap().len(), 1);
    assert!(all["data"][0]["gatewayOrderId"].is_string());
}

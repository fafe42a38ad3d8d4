use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{success_response, success_with_message};
use crate::{
    auth::BuyerSession,
    errors::ServiceError,
    services::{orders::CheckoutInput, payments::VerifyPayment},
    tracing::RequestContext,
    AppState,
};

/// Guest checkout body: the regular checkout fields plus an optional
/// storefront-side guest reference used only for correlation.
#[derive(Debug, Deserialize)]
pub struct GuestCheckoutRequest {
    #[serde(rename = "guestId", default)]
    pub guest_id: Option<String>,
    #[serde(flatten)]
    pub checkout: CheckoutInput,
}

#[derive(Debug, Deserialize)]
pub struct GuestVerifyRequest {
    #[serde(rename = "guestId", default)]
    pub guest_id: Option<String>,
    #[serde(flatten)]
    pub payment: VerifyPayment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    pub already_verified: bool,
}

/// POST /api/v1/orders/razorpay
pub async fn create_checkout(
    State(state): State<AppState>,
    buyer: BuyerSession,
    Json(input): Json<CheckoutInput>,
) -> Result<Response, ServiceError> {
    let ctx = RequestContext::for_buyer(buyer.user_id);
    let checkout = state
        .services
        .checkout
        .spawn_gateway_checkout(ctx, input)
        .await?;
    Ok(success_response(checkout))
}

/// POST /api/v1/orders/razorpay/guest
pub async fn create_guest_checkout(
    State(state): State<AppState>,
    Json(request): Json<GuestCheckoutRequest>,
) -> Result<Response, ServiceError> {
    let ctx = RequestContext::for_guest(request.guest_id.as_deref());
    let checkout = state
        .services
        .checkout
        .spawn_gateway_checkout(ctx, request.checkout)
        .await?;
    Ok(success_response(checkout))
}

/// POST /api/v1/orders/razorpay/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    buyer: BuyerSession,
    Json(payment): Json<VerifyPayment>,
) -> Result<Response, ServiceError> {
    let ctx = RequestContext::for_buyer(buyer.user_id);
    let verified = state.services.verifier.verify_payment(&ctx, payment).await?;
    Ok(success_with_message(
        PaymentConfirmation {
            order_id: verified.order_id,
            already_verified: verified.already_verified,
        },
        "Payment Successful",
    ))
}

/// POST /api/v1/orders/razorpay/guest/verify
pub async fn verify_guest_payment(
    State(state): State<AppState>,
    Json(request): Json<GuestVerifyRequest>,
) -> Result<Response, ServiceError> {
    let ctx = RequestContext::for_guest(request.guest_id.as_deref());
    let verified = state
        .services
        .verifier
        .verify_payment(&ctx, request.payment)
        .await?;
    Ok(success_with_message(
        PaymentConfirmation {
            order_id: verified.order_id,
            already_verified: verified.already_verified,
        },
        "Payment Successful",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn guest_checkout_body_flattens_checkout_fields() {
        let request: GuestCheckoutRequest = serde_json::from_value(json!({
            "guestId": "sess-1",
            "items": [{ "productId": "p1", "quantity": 1, "price": 250 }],
            "amount": 250.5,
            "address": { "city": "Pune" }
        }))
        .unwrap();
        assert_eq!(request.guest_id.as_deref(), Some("sess-1"));
        assert_eq!(request.checkout.amount, dec!(250.5));
    }

    #[test]
    fn verify_body_uses_gateway_field_names() {
        let request: GuestVerifyRequest = serde_json::from_value(json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "abc"
        }))
        .unwrap();
        assert!(request.guest_id.is_none());
        assert_eq!(request.payment.remote_order_id, "order_1");
        assert_eq!(request.payment.payment_id, "pay_1");
        assert_eq!(request.payment.signature, "abc");
    }
}

use axum::{extract::State, response::Response, Json};
use serde::Serialize;
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::{AdminSession, BuyerSession},
    errors::ServiceError,
    services::orders::{CheckoutInput, UpdateOrderStatusRequest},
    tracing::RequestContext,
    AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: Uuid,
}

/// POST /api/v1/orders/cod
pub async fn place_cod_order(
    State(state): State<AppState>,
    buyer: BuyerSession,
    Json(input): Json<CheckoutInput>,
) -> Result<Response, ServiceError> {
    let ctx = RequestContext::for_buyer(buyer.user_id);
    let order_id = state.services.orders.place_cod_order(&ctx, input).await?;
    Ok(created_response(PlacedOrder { order_id }, "Order Placed"))
}

/// GET /api/v1/orders/mine
pub async fn list_my_orders(
    State(state): State<AppState>,
    buyer: BuyerSession,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.orders_for_user(&buyer.user_id).await?;
    Ok(success_response(orders))
}

/// GET /api/v1/orders
pub async fn list_all_orders(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.all_orders().await?;
    Ok(success_response(orders))
}

/// POST /api/v1/orders/status
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: AdminSession,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Response, ServiceError> {
    tracing::info!(admin = %admin.email, order_id = %request.order_id, "Admin status change");
    state.services.orders.update_status(request).await?;
    Ok(created_response(serde_json::Value::Null, "Status Updated"))
}

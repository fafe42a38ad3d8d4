use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::success_response;
use crate::{auth::BuyerSession, errors::ServiceError, AppState};

/// Product id -> size -> quantity
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBody {
    pub cart_data: Value,
}

/// GET /api/v1/cart
pub async fn get_cart(
    State(state): State<AppState>,
    buyer: BuyerSession,
) -> Result<Response, ServiceError> {
    let cart_data = state.services.carts.get(&buyer.user_id).await?;
    Ok(success_response(CartBody { cart_data }))
}

/// PUT /api/v1/cart
pub async fn replace_cart(
    State(state): State<AppState>,
    buyer: BuyerSession,
    Json(body): Json<CartBody>,
) -> Result<Response, ServiceError> {
    if !body.cart_data.is_object() {
        return Err(ServiceError::ValidationError(
            "cartData must be an object".to_string(),
        ));
    }
    state
        .services
        .carts
        .replace(&buyer.user_id, body.cart_data.clone())
        .await?;
    Ok(success_response(body))
}

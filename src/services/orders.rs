use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{borrow::Cow, sync::Arc};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::order::{Model as OrderModel, PaymentMethod},
    errors::ServiceError,
    repositories::{CartStore, NewOrder, OrderStore},
    services::payments::money::round_to_charge,
    tracing::RequestContext,
};

/// Checkout payload shared by cash-on-delivery and gateway orders.
///
/// Missing fields deserialize to empty values so validation, not the JSON
/// extractor, decides what is wrong with a request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutInput {
    #[serde(default)]
    #[validate(custom = "validate_items")]
    pub items: Value,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_address")]
    pub address: Value,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_items(items: &Value) -> Result<(), ValidationError> {
    match items.as_array() {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err(invalid("items", "at least one item is required")),
    }
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(invalid("amount", "amount must be greater than zero"))
    }
}

fn validate_address(address: &Value) -> Result<(), ValidationError> {
    match address.as_object() {
        Some(fields) if !fields.is_empty() => Ok(()),
        _ => Err(invalid("address", "a shipping address is required")),
    }
}

impl CheckoutInput {
    /// The stored amount is the charged amount, rounded like the minor-unit conversion.
    pub(crate) fn into_new_order(self, user_id: &str, payment_method: PaymentMethod) -> NewOrder {
        NewOrder {
            user_id: user_id.to_string(),
            items: self.items,
            amount: round_to_charge(self.amount),
            address: self.address,
            payment_method,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "Status must be 1-64 characters"))]
    pub status: String,
}

/// Order placement and administration outside the gateway flow
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>, carts: Arc<dyn CartStore>) -> Self {
        Self { orders, carts }
    }

    /// Persists a cash-on-delivery order and empties the buyer's cart.
    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id, buyer_id = %ctx.buyer_id))]
    pub async fn place_cod_order(
        &self,
        ctx: &RequestContext,
        input: CheckoutInput,
    ) -> Result<Uuid, ServiceError> {
        input.validate()?;

        let order = self
            .orders
            .create(input.into_new_order(&ctx.buyer_id, PaymentMethod::CashOnDelivery))
            .await?;
        info!(order_id = %order.id, "Cash on delivery order placed");

        if let Err(e) = self.carts.clear(&ctx.buyer_id).await {
            warn!(order_id = %order.id, error = %e, "Failed to clear cart after order placement");
        }

        Ok(order.id)
    }

    /// A buyer's own orders, newest first
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderModel>, ServiceError> {
        self.orders.list_for_user(user_id).await
    }

    pub async fn all_orders(&self) -> Result<Vec<OrderModel>, ServiceError> {
        self.orders.list_all().await
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn update_status(&self, request: UpdateOrderStatusRequest) -> Result<(), ServiceError> {
        request.validate()?;
        let status = request.status.trim();
        if status.is_empty() {
            return Err(ServiceError::ValidationError(
                "status: Status must be 1-64 characters".to_string(),
            ));
        }

        if !self.orders.update_status(request.order_id, status).await? {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                request.order_id
            )));
        }
        info!(status, "Order status updated");
        Ok(())
    }
}

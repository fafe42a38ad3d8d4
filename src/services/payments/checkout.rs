use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument, Span};
use uuid::Uuid;
use validator::Validate;

use super::credentials::CredentialSource;
use super::gateway::{CreateGatewayOrder, PaymentGateway};
use super::money::to_minor_units;
use crate::{
    entities::order::PaymentMethod,
    errors::ServiceError,
    repositories::OrderStore,
    services::orders::CheckoutInput,
    tracing::RequestContext,
};

/// What the storefront needs to open the gateway's checkout widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCheckout {
    /// Remote order id
    pub id: String,
    /// Amount in minor units, as sent to the gateway
    pub amount: i64,
    pub currency: String,
    /// Local order id
    pub receipt: String,
    /// Public key id of the credential pair used to create the remote order
    pub key: String,
}

/// Creates a gateway order tied 1:1 to a freshly persisted local order.
///
/// The local row is written before any gateway call. If credentials are
/// missing or the gateway fails, that row is deleted again so no unpaid
/// order is left without a remote counterpart.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    credentials: Arc<dyn CredentialSource>,
    currency: String,
}

impl CheckoutOrchestrator {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        credentials: Arc<dyn CredentialSource>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            gateway,
            credentials,
            currency: currency.into(),
        }
    }

    #[instrument(
        skip(self, ctx, input),
        fields(request_id = %ctx.request_id, buyer_id = %ctx.buyer_id, guest = ctx.guest)
    )]
    pub async fn create_gateway_checkout(
        &self,
        ctx: &RequestContext,
        input: CheckoutInput,
    ) -> Result<GatewayCheckout, ServiceError> {
        input.validate()?;
        // Derived from the same decimal that is stored; verification recomputes from the row.
        let amount = to_minor_units(input.amount)?;

        let order = self
            .orders
            .create(input.into_new_order(&ctx.buyer_id, PaymentMethod::Gateway))
            .await?;
        let order_id = order.id.to_string();
        info!(order_id = %order_id, amount, "Pending gateway order persisted");

        let Some(credentials) = self.credentials.resolve() else {
            error!(order_id = %order_id, "No gateway credentials configured");
            self.roll_back(order.id).await;
            return Err(ServiceError::PaymentConfiguration);
        };
        info!(
            mode = %credentials.mode,
            key = credentials.key_prefix(),
            "Using gateway credentials"
        );

        let request = CreateGatewayOrder::new(amount, &self.currency, &order_id, &ctx.buyer_id);
        let remote = match self.gateway.create_order(&credentials, &request).await {
            Ok(remote) => remote,
            Err(failure) => {
                error!(
                    order_id = %order_id,
                    mode = %credentials.mode,
                    error = %failure,
                    "Gateway order creation failed"
                );
                self.roll_back(order.id).await;
                return Err(ServiceError::Gateway {
                    details: failure.description(),
                    mode: credentials.mode,
                });
            }
        };

        if remote.receipt.as_deref().is_some_and(|r| r != order_id) {
            warn!(
                order_id = %order_id,
                remote_receipt = ?remote.receipt,
                "Gateway echoed a different receipt"
            );
        }

        if let Err(e) = self.orders.attach_gateway_order(order.id, &remote.id).await {
            warn!(
                order_id = %order_id,
                remote_order_id = %remote.id,
                error = %e,
                "Failed to record gateway order id; receipt still links the orders"
            );
        }

        info!(order_id = %order_id, remote_order_id = %remote.id, "Gateway checkout created");
        Ok(GatewayCheckout {
            id: remote.id,
            amount,
            currency: self.currency.clone(),
            receipt: order_id,
            key: credentials.key_id,
        })
    }

    /// Runs [`Self::create_gateway_checkout`] on its own task. Dropping the
    /// returned future (client disconnect, request timeout) does not stop the
    /// task, so a pending order is always either linked or rolled back.
    pub async fn spawn_gateway_checkout(
        self: &Arc<Self>,
        ctx: RequestContext,
        input: CheckoutInput,
    ) -> Result<GatewayCheckout, ServiceError> {
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(
            async move { orchestrator.create_gateway_checkout(&ctx, input).await }
                .instrument(Span::current()),
        );

        task.await.map_err(|e| {
            error!(error = %e, "Checkout task did not complete");
            ServiceError::InternalError(format!("checkout task failed: {}", e))
        })?
    }

    async fn roll_back(&self, order_id: Uuid) {
        match self.orders.delete(order_id).await {
            Ok(true) => info!(order_id = %order_id, "Pending order rolled back"),
            Ok(false) => warn!(order_id = %order_id, "Pending order already gone during rollback"),
            Err(e) => error!(order_id = %order_id, error = %e, "Failed to roll back pending order"),
        }
    }
}

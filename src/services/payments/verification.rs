use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::credentials::CredentialSource;
use super::gateway::PaymentGateway;
use super::money::to_minor_units;
use crate::{
    errors::ServiceError,
    repositories::{CartStore, OrderStore, PaymentEvidence},
    tracing::RequestContext,
};

type HmacSha256 = Hmac<Sha256>;

/// A payment-completion notification relayed by the storefront
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPayment {
    #[serde(rename = "razorpay_order_id", default)]
    pub remote_order_id: String,
    #[serde(rename = "razorpay_payment_id", default)]
    pub payment_id: String,
    #[serde(rename = "razorpay_signature", default)]
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub order_id: Uuid,
    /// The order had already been marked paid by an earlier notification.
    pub already_verified: bool,
}

/// Hex HMAC-SHA256 of `"{remote_order_id}|{payment_id}"` keyed by the gateway secret.
pub fn compute_signature(
    secret: &str,
    remote_order_id: &str,
    payment_id: &str,
) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::PaymentConfiguration)?;
    mac.update(remote_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Confirms signed payment notifications and marks the linked order paid.
///
/// Nothing is written until the signature matches, the remote order has been
/// fetched, and its amount and currency agree with the local order.
#[derive(Clone)]
pub struct PaymentVerifier {
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    gateway: Arc<dyn PaymentGateway>,
    credentials: Arc<dyn CredentialSource>,
    currency: String,
}

impl PaymentVerifier {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        gateway: Arc<dyn PaymentGateway>,
        credentials: Arc<dyn CredentialSource>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            carts,
            gateway,
            credentials,
            currency: currency.into(),
        }
    }

    #[instrument(
        skip(self, ctx, notification),
        fields(
            request_id = %ctx.request_id,
            buyer_id = %ctx.buyer_id,
            remote_order_id = %notification.remote_order_id
        )
    )]
    pub async fn verify_payment(
        &self,
        ctx: &RequestContext,
        notification: VerifyPayment,
    ) -> Result<VerifiedPayment, ServiceError> {
        let VerifyPayment {
            remote_order_id,
            payment_id,
            signature,
        } = notification;
        if remote_order_id.trim().is_empty()
            || payment_id.trim().is_empty()
            || signature.trim().is_empty()
        {
            return Err(ServiceError::ValidationError(
                "razorpay_order_id, razorpay_payment_id and razorpay_signature are required"
                    .to_string(),
            ));
        }

        let credentials = self.credentials.resolve().ok_or_else(|| {
            error!("No gateway credentials configured");
            ServiceError::PaymentConfiguration
        })?;

        let expected = compute_signature(&credentials.key_secret, &remote_order_id, &payment_id)?;
        if !constant_time_eq(&expected, &signature) {
            warn!(
                payment_id = %payment_id,
                mode = %credentials.mode,
                "Payment signature mismatch"
            );
            return Err(ServiceError::SignatureInvalid);
        }

        let remote = self
            .gateway
            .fetch_order(&credentials, &remote_order_id)
            .await
            .map_err(|failure| {
                warn!(error = %failure, "Could not fetch gateway order for verification");
                ServiceError::VerificationUnavailable(failure.to_string())
            })?;
        info!(remote_status = ?remote.status, "Fetched gateway order");

        let receipt = remote
            .receipt
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                error!("Signed gateway order carries no receipt");
                ServiceError::InconsistentState(format!(
                    "gateway order {} has no receipt",
                    remote_order_id
                ))
            })?;

        let order_id = Uuid::parse_str(receipt).map_err(|_| {
            error!(receipt, "Gateway receipt is not a local order id");
            ServiceError::InconsistentState(format!("unrecognised receipt {}", receipt))
        })?;

        let order = self.orders.find(order_id).await?.ok_or_else(|| {
            error!(order_id = %order_id, "Receipt points at a missing order");
            ServiceError::InconsistentState(format!("order {} not found", order_id))
        })?;

        if let Some(linked) = order.gateway_order_id.as_deref() {
            if linked != remote_order_id {
                error!(order_id = %order_id, linked, "Order is linked to another gateway order");
                return Err(ServiceError::InconsistentState(format!(
                    "order {} is linked to a different gateway order",
                    order_id
                )));
            }
        }

        let expected_amount = to_minor_units(order.amount).map_err(|_| {
            ServiceError::InconsistentState(format!("order {} has no chargeable amount", order_id))
        })?;
        if remote.amount != expected_amount || !remote.currency.eq_ignore_ascii_case(&self.currency)
        {
            error!(
                order_id = %order_id,
                expected_amount,
                remote_amount = remote.amount,
                remote_currency = %remote.currency,
                "Gateway amount does not match order"
            );
            return Err(ServiceError::AmountMismatch {
                expected: format!("{} {}", expected_amount, self.currency),
                actual: format!("{} {}", remote.amount, remote.currency),
            });
        }

        if order.payment {
            if order.gateway_payment_id.as_deref() != Some(payment_id.as_str()) {
                warn!(order_id = %order_id, "Paid order notified with a different payment id");
            }
            info!(order_id = %order_id, "Payment already verified");
            return Ok(VerifiedPayment {
                order_id,
                already_verified: true,
            });
        }

        let evidence = PaymentEvidence {
            gateway_order_id: remote_order_id.clone(),
            payment_id,
            signature,
            verified_at: Utc::now(),
        };
        let already_verified = if self.orders.mark_paid(order_id, evidence).await? {
            false
        } else {
            // Lost a race with a concurrent notification, or the row vanished.
            match self.orders.find(order_id).await? {
                Some(current) if current.payment => true,
                _ => {
                    error!(order_id = %order_id, "Order disappeared before it could be marked paid");
                    return Err(ServiceError::InconsistentState(format!(
                        "order {} could not be marked paid",
                        order_id
                    )));
                }
            }
        };
        info!(order_id = %order_id, mode = %credentials.mode, "Payment verified");

        if !ctx.guest {
            if let Err(e) = self.carts.clear(&ctx.buyer_id).await {
                warn!(order_id = %order_id, error = %e, "Failed to clear cart after payment");
            }
        }

        Ok(VerifiedPayment {
            order_id,
            already_verified,
        })
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::credentials::GatewayCredentials;

/// Metadata attached to a remote order for operators browsing the gateway dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotes {
    pub order_id: String,
    pub user_id: String,
}

/// Body of a create-order call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGatewayOrder {
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    /// Local order id; echoed back unmodified and used to join callbacks to orders
    pub receipt: String,
    pub payment_capture: u8,
    pub notes: OrderNotes,
}

impl CreateGatewayOrder {
    pub fn new(amount: i64, currency: &str, order_id: &str, user_id: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            receipt: order_id.to_string(),
            payment_capture: 1,
            notes: OrderNotes {
                order_id: order_id.to_string(),
                user_id: user_id.to_string(),
            },
        }
    }
}

/// A remote order as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Why a gateway call did not produce an order
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayFailure {
    #[error("gateway rejected the request ({status}): {description}")]
    Rejected {
        status: u16,
        code: Option<String>,
        description: String,
    },

    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway unreachable: {0}")]
    Transport(String),

    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayFailure {
    /// Text safe to relay to the buyer
    pub fn description(&self) -> String {
        match self {
            Self::Rejected { description, .. } => description.clone(),
            Self::Timeout => "Payment gateway timed out".to_string(),
            Self::Transport(_) => "Payment gateway unreachable".to_string(),
            Self::Decode(_) => "Unexpected payment gateway response".to_string(),
        }
    }
}

/// Outbound operations against the payment gateway. Credentials are passed per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        credentials: &GatewayCredentials,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, GatewayFailure>;

    async fn fetch_order(
        &self,
        credentials: &GatewayCredentials,
        remote_order_id: &str,
    ) -> Result<GatewayOrder, GatewayFailure>;
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status given to every order when it is first persisted.
pub const STATUS_ORDER_PLACED: &str = "Order Placed";
/// Status set once a gateway payment is verified.
pub const STATUS_PAID: &str = "Paid";

/// Storefront order. Items and address are stored verbatim as submitted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Json")]
    pub address: Json,
    pub status: String,
    pub payment_method: PaymentMethod,
    pub payment: bool,
    #[sea_orm(nullable)]
    pub gateway_order_id: Option<String>,
    #[sea_orm(nullable)]
    pub gateway_payment_id: Option<String>,
    #[sea_orm(nullable)]
    pub gateway_signature: Option<String>,
    #[sea_orm(nullable)]
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// How the buyer pays for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "COD")]
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[sea_orm(string_value = "Razorpay")]
    #[serde(rename = "Razorpay")]
    Gateway,
}

impl Model {
    /// A paid order must carry the gateway's payment id, signature and verification time.
    pub fn payment_evidence_complete(&self) -> bool {
        !self.payment
            || (self
                .gateway_payment_id
                .as_deref()
                .is_some_and(|id| !id.is_empty())
                && self
                    .gateway_signature
                    .as_deref()
                    .is_some_and(|sig| !sig.is_empty())
                && self.payment_verified_at.is_some())
    }
}

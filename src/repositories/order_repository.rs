use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel, PaymentMethod,
    STATUS_ORDER_PLACED, STATUS_PAID,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Fields supplied when an order is first persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: String,
    pub items: Value,
    pub amount: Decimal,
    pub address: Value,
    pub payment_method: PaymentMethod,
}

/// What the verifier records when a payment is confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvidence {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub verified_at: DateTime<Utc>,
}

/// Persistence operations the order flows depend on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an unpaid order with the default status.
    async fn create(&self, order: NewOrder) -> Result<OrderModel, ServiceError>;

    async fn find(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;

    async fn attach_gateway_order(
        &self,
        id: Uuid,
        gateway_order_id: &str,
    ) -> Result<(), ServiceError>;

    /// Marks an unpaid order paid. Returns `false` when no unpaid row matched,
    /// either because the order is missing or it was already paid.
    async fn mark_paid(&self, id: Uuid, evidence: PaymentEvidence) -> Result<bool, ServiceError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<OrderModel>, ServiceError>;

    async fn list_all(&self) -> Result<Vec<OrderModel>, ServiceError>;

    /// Returns whether the order existed.
    async fn update_status(&self, id: Uuid, status: &str) -> Result<bool, ServiceError>;
}

/// Repository for order operations
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create(&self, order: NewOrder) -> Result<OrderModel, ServiceError> {
        let model = OrderActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(order.user_id),
            items: Set(order.items),
            amount: Set(order.amount),
            address: Set(order.address),
            status: Set(STATUS_ORDER_PLACED.to_string()),
            payment_method: Set(order.payment_method),
            payment: Set(false),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            gateway_signature: Set(None),
            payment_verified_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        model
            .insert(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn find(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Order::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let result = Order::delete_by_id(id)
            .exec(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(result.rows_affected > 0)
    }

    async fn attach_gateway_order(
        &self,
        id: Uuid,
        gateway_order_id: &str,
    ) -> Result<(), ServiceError> {
        Order::update_many()
            .col_expr(Column::GatewayOrderId, Expr::value(gateway_order_id))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(())
    }

    async fn mark_paid(&self, id: Uuid, evidence: PaymentEvidence) -> Result<bool, ServiceError> {
        let result = Order::update_many()
            .col_expr(Column::Payment, Expr::value(true))
            .col_expr(Column::Status, Expr::value(STATUS_PAID))
            .col_expr(Column::GatewayOrderId, Expr::value(evidence.gateway_order_id))
            .col_expr(Column::GatewayPaymentId, Expr::value(evidence.payment_id))
            .col_expr(Column::GatewaySignature, Expr::value(evidence.signature))
            .col_expr(Column::PaymentVerifiedAt, Expr::value(evidence.verified_at))
            .col_expr(Column::UpdatedAt, Expr::value(evidence.verified_at))
            .filter(Column::Id.eq(id))
            .filter(Column::Payment.eq(false))
            .exec(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<OrderModel>, ServiceError> {
        Order::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn list_all(&self) -> Result<Vec<OrderModel>, ServiceError> {
        Order::find()
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<bool, ServiceError> {
        let result = Order::update_many()
            .col_expr(Column::Status, Expr::value(status))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(result.rows_affected > 0)
    }
}

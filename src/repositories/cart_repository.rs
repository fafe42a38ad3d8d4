use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{sea_query::OnConflict, DatabaseConnection, EntityTrait, Set};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::entities::cart::{ActiveModel as CartActiveModel, Column, Entity as Cart};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Cart persistence keyed by buyer id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The buyer's cart, or an empty object when none is stored.
    async fn get(&self, user_id: &str) -> Result<Value, ServiceError>;

    async fn replace(&self, user_id: &str, items: Value) -> Result<(), ServiceError>;

    async fn clear(&self, user_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn get(&self, user_id: &str) -> Result<Value, ServiceError> {
        let cart = Cart::find_by_id(user_id.to_string())
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(cart.map(|c| c.items).unwrap_or_else(|| json!({})))
    }

    async fn replace(&self, user_id: &str, items: Value) -> Result<(), ServiceError> {
        let model = CartActiveModel {
            user_id: Set(user_id.to_string()),
            items: Set(items),
            updated_at: Set(Utc::now()),
        };

        Cart::insert(model)
            .on_conflict(
                OnConflict::column(Column::UserId)
                    .update_columns([Column::Items, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), ServiceError> {
        Cart::delete_by_id(user_id.to_string())
            .exec(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(())
    }
}

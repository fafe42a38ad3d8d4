pub mod cart_repository;
pub mod order_repository;

pub use cart_repository::{CartRepository, CartStore};
pub use order_repository::{NewOrder, OrderRepository, OrderStore, PaymentEvidence};

#[cfg(test)]
pub use cart_repository::MockCartStore;
#[cfg(test)]
pub use order_repository::MockOrderStore;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

/// Shared connection handle embedded by each repository
#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

pub mod cart;
pub mod common;
pub mod orders;
pub mod payments;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::repositories::{CartRepository, CartStore, OrderRepository, OrderStore};
use crate::services::{
    orders::OrderService,
    payments::{CheckoutOrchestrator, CredentialSource, PaymentGateway, PaymentVerifier},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutOrchestrator>,
    pub verifier: Arc<PaymentVerifier>,
    pub carts: Arc<dyn CartStore>,
}

impl AppServices {
    /// Wires the database-backed stores to the order and payment services.
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        credentials: Arc<dyn CredentialSource>,
        currency: &str,
    ) -> Self {
        let orders: Arc<dyn OrderStore> = Arc::new(OrderRepository::new(db.clone()));
        let carts: Arc<dyn CartStore> = Arc::new(CartRepository::new(db));

        Self::from_parts(orders, carts, gateway, credentials, currency)
    }

    pub fn from_parts(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        gateway: Arc<dyn PaymentGateway>,
        credentials: Arc<dyn CredentialSource>,
        currency: &str,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(orders.clone(), carts.clone())),
            checkout: Arc::new(CheckoutOrchestrator::new(
                orders.clone(),
                gateway.clone(),
                credentials.clone(),
                currency,
            )),
            verifier: Arc::new(PaymentVerifier::new(
                orders,
                carts.clone(),
                gateway,
                credentials,
                currency,
            )),
            carts,
        }
    }
}

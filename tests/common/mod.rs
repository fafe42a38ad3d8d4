#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use storefront_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    handlers::AppServices,
    services::payments::{
        compute_signature, CreateGatewayOrder, GatewayCredentials, GatewayFailure, GatewayOrder,
        KeyMaterial, KeyPair, PaymentGateway, StaticCredentialSource,
    },
    AppState,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "kP9s2LmQ7vXr4TzW8bNc1YdF6hJg3AeU";
pub const ADMIN_EMAIL: &str = "admin@shop.example";
pub const TEST_KEY_ID: &str = "rzp_test_Abc123Def456";
pub const TEST_KEY_SECRET: &str = "test_secret_for_integration";

#[derive(Default)]
struct GatewayState {
    created: Vec<CreateGatewayOrder>,
    orders: HashMap<String, GatewayOrder>,
    fail_create: Option<GatewayFailure>,
    fail_fetch: Option<GatewayFailure>,
    create_delay: Option<Duration>,
    counter: u32,
}

/// In-process stand-in for the gateway. Remote orders echo the receipt they were created with.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn fail_create_with(&self, failure: GatewayFailure) {
        self.state.lock().unwrap().fail_create = Some(failure);
    }

    /// Makes every create-order call take `delay` before answering.
    pub fn delay_create_by(&self, delay: Duration) {
        self.state.lock().unwrap().create_delay = Some(delay);
    }

    pub fn fail_fetch_with(&self, failure: GatewayFailure) {
        self.state.lock().unwrap().fail_fetch = Some(failure);
    }

    /// Overwrites what the gateway reports for a remote order.
    pub fn put_order(&self, order: GatewayOrder) {
        self.state
            .lock()
            .unwrap()
            .orders
            .insert(order.id.clone(), order);
    }

    pub fn created(&self) -> Vec<CreateGatewayOrder> {
        self.state.lock().unwrap().created.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        _credentials: &GatewayCredentials,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, GatewayFailure> {
        let delay = self.state.lock().unwrap().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.created.push(request.clone());
        if let Some(failure) = state.fail_create.clone() {
            return Err(failure);
        }
        state.counter += 1;
        let order = GatewayOrder {
            id: format!("order_fake{:04}", state.counter),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        };
        state.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(
        &self,
        _credentials: &GatewayCredentials,
        remote_order_id: &str,
    ) -> Result<GatewayOrder, GatewayFailure> {
        let state = self.state.lock().unwrap();
        if let Some(failure) = state.fail_fetch.clone() {
            return Err(failure);
        }
        state
            .orders
            .get(remote_order_id)
            .cloned()
            .ok_or(GatewayFailure::Rejected {
                status: 400,
                code: Some("BAD_REQUEST_ERROR".to_string()),
                description: "The id provided does not exist".to_string(),
            })
    }
}

/// Router over an in-memory SQLite database and a fake gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    auth: Arc<AuthService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_key_material(Self::test_keys()).await
    }

    pub async fn without_credentials() -> Self {
        Self::with_key_material(KeyMaterial::default()).await
    }

    /// App whose whole-request timeout is `secs` seconds.
    pub async fn with_request_timeout(secs: u64) -> Self {
        let mut cfg = Self::base_config();
        cfg.request_timeout_secs = secs;
        Self::build(cfg, Self::test_keys()).await
    }

    pub async fn with_key_material(material: KeyMaterial) -> Self {
        Self::build(Self::base_config(), material).await
    }

    fn test_keys() -> KeyMaterial {
        KeyMaterial {
            mode_override: None,
            live: None,
            test: KeyPair::from_parts(Some(TEST_KEY_ID), Some(TEST_KEY_SECRET)),
        }
    }

    fn base_config() -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.admin_email = Some(ADMIN_EMAIL.to_string());
        cfg
    }

    async fn build(cfg: AppConfig, material: KeyMaterial) -> Self {
        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let pool = Arc::new(pool);

        let gateway = Arc::new(FakeGateway::default());
        let credentials = Arc::new(StaticCredentialSource::new(material));
        let auth = Arc::new(AuthService::new(JWT_SECRET, ADMIN_EMAIL));
        let services = AppServices::new(pool.clone(), gateway.clone(), credentials, &cfg.currency);

        let state = AppState {
            db: pool,
            config: cfg,
            auth: auth.clone(),
            services,
        };
        let router = storefront_api::app_router(state.clone());

        Self {
            router,
            state,
            gateway,
            auth,
        }
    }

    pub fn buyer_token(&self, user_id: &str) -> String {
        self.auth
            .issue_buyer_token(user_id)
            .expect("buyer token should be issued")
    }

    pub fn admin_token(&self) -> String {
        self.auth
            .issue_admin_token()
            .expect("admin token should be issued")
    }

    /// Signature the gateway would attach to a successful payment.
    pub fn sign(&self, remote_order_id: &str, payment_id: &str) -> String {
        compute_signature(TEST_KEY_SECRET, remote_order_id, payment_id)
            .expect("signature should compute")
    }

    /// Sends a request, authenticating with the `token` cookie when one is given.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::COOKIE, format!("token={}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Same as [`TestApp::request`] but with a bearer header instead of the cookie.
    pub async fn request_with_bearer(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: &str,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::credentials::GatewayCredentials;
use super::gateway::{CreateGatewayOrder, GatewayFailure, GatewayOrder, PaymentGateway};

/// Error envelope returned by the Razorpay REST API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Razorpay orders API over HTTPS with basic auth.
///
/// A client is built for each call from the credentials resolved for that
/// request, so no key material outlives the operation that needed it.
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    base_url: String,
    timeout: Duration,
}

impl RazorpayGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn client(&self) -> Result<Client, GatewayFailure> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| GatewayFailure::Transport(e.to_string()))
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }
}

fn send_error(err: reqwest::Error) -> GatewayFailure {
    if err.is_timeout() {
        GatewayFailure::Timeout
    } else {
        GatewayFailure::Transport(err.to_string())
    }
}

async fn decode_order(response: Response) -> Result<GatewayOrder, GatewayFailure> {
    let status = response.status();
    if status.is_success() {
        return response.json::<GatewayOrder>().await.map_err(|e| {
            if e.is_timeout() {
                GatewayFailure::Timeout
            } else {
                GatewayFailure::Decode(e.to_string())
            }
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(rejection(status, &body))
}

fn rejection(status: StatusCode, body: &str) -> GatewayFailure {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.error.code.clone());
    let description = parsed
        .and_then(|e| e.error.description)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Gateway error")
                .to_string()
        });

    warn!(status = status.as_u16(), code = ?code, "Razorpay rejected request");
    GatewayFailure::Rejected {
        status: status.as_u16(),
        code,
        description,
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, credentials, request), fields(mode = %credentials.mode, receipt = %request.receipt))]
    async fn create_order(
        &self,
        credentials: &GatewayCredentials,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, GatewayFailure> {
        let response = self
            .client()?
            .post(self.orders_url())
            .basic_auth(&credentials.key_id, Some(&credentials.key_secret))
            .json(request)
            .send()
            .await
            .map_err(send_error)?;

        let order = decode_order(response).await?;
        debug!(remote_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    #[instrument(skip(self, credentials), fields(mode = %credentials.mode))]
    async fn fetch_order(
        &self,
        credentials: &GatewayCredentials,
        remote_order_id: &str,
    ) -> Result<GatewayOrder, GatewayFailure> {
        let response = self
            .client()?
            .get(format!("{}/{}", self.orders_url(), remote_order_id))
            .basic_auth(&credentials.key_id, Some(&credentials.key_secret))
            .send()
            .await
            .map_err(send_error)?;

        decode_order(response).await
    }
}

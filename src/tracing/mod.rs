use axum::http::Request;
use std::{cell::RefCell, fmt, future::Future};
use tower_http::{
    classify::{SharedClassifier, StatusInRangeAsFailures},
    trace::{
        DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
        MakeSpan, TraceLayer,
    },
};
use uuid::Uuid;

/// Placeholder buyer identity used for checkouts without a session.
pub const GUEST_BUYER_ID: &str = "guest";

/// Request ID tracking information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .or_else(|| {
                request
                    .headers()
                    .get(crate::middleware_helpers::request_id::REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(RequestId::new)
            })
            .unwrap_or_default();

        tracing::info_span!(
            "http.request",
            request_id = %request_id.as_str(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Configure tracing for the application with tower-http
pub fn configure_http_tracing() -> TraceLayer<
    SharedClassifier<StatusInRangeAsFailures>,
    RequestSpanMaker,
    DefaultOnRequest,
    DefaultOnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    DefaultOnFailure,
> {
    let classifier = SharedClassifier::new(StatusInRangeAsFailures::new(500..=599));
    TraceLayer::new(classifier)
        .make_span_with(RequestSpanMaker)
        .on_request(DefaultOnRequest::default())
        .on_response(DefaultOnResponse::default())
        .on_body_chunk(DefaultOnBodyChunk::default())
        .on_eos(DefaultOnEos::default())
        .on_failure(DefaultOnFailure::default())
}

/// Per-request correlation data handed to the checkout and verification flows.
///
/// Only used to enrich spans and log lines; nothing branches on it except the
/// guest flag, which decides whether there is a cart to clear.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub buyer_id: String,
    pub guest: bool,
}

impl RequestContext {
    /// Context for an authenticated buyer, reusing the ambient request id when present.
    pub fn for_buyer(buyer_id: impl Into<String>) -> Self {
        Self {
            request_id: current_request_id().unwrap_or_default(),
            buyer_id: buyer_id.into(),
            guest: false,
        }
    }

    /// Context for a guest checkout. `guest_ref` lets a storefront correlate
    /// repeated guest calls; without it every guest shares the placeholder id.
    pub fn for_guest(guest_ref: Option<&str>) -> Self {
        let buyer_id = match guest_ref.map(str::trim).filter(|s| !s.is_empty()) {
            Some(reference) => format!("{}:{}", GUEST_BUYER_ID, reference),
            None => GUEST_BUYER_ID.to_string(),
        };
        Self {
            request_id: current_request_id().unwrap_or_default(),
            buyer_id,
            guest: true,
        }
    }
}

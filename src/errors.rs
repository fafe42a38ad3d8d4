use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

use crate::services::payments::credentials::GatewayMode;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Bad Gateway")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Extra diagnostic text, e.g. the gateway's description of a rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Credential mode that was active when a gateway call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// No usable gateway credential pair is configured.
    #[error("Payment configuration missing")]
    PaymentConfiguration,

    /// The gateway rejected or failed a create-order call.
    #[error("Failed to create payment order: {details}")]
    Gateway { details: String, mode: GatewayMode },

    #[error("Payment signature mismatch")]
    SignatureInvalid,

    /// The gateway could not be reached to confirm a signed payment.
    #[error("Payment verification unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("Inconsistent payment state: {0}")]
    InconsistentState(String),

    #[error("Payment amount mismatch: expected {expected}, gateway reported {actual}")]
    AmountMismatch { expected: String, actual: String },

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Convenience constructor for wrapping string-based database errors.
    pub fn database_error_message(message: impl Into<String>) -> Self {
        ServiceError::DatabaseError(DbErr::Custom(message.into()))
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::BadRequest(_) | Self::SignatureInvalid => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Gateway { .. } => StatusCode::BAD_GATEWAY,
            Self::AmountMismatch { .. } => StatusCode::CONFLICT,
            Self::InternalError(_)
            | Self::SerializationError(_)
            | Self::PaymentConfiguration
            | Self::VerificationUnavailable(_)
            | Self::InconsistentState(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors and verification failures return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::SerializationError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::Gateway { .. } => "Failed to create payment order".to_string(),
            Self::SignatureInvalid
            | Self::VerificationUnavailable(_)
            | Self::InconsistentState(_) => "Payment verification failed".to_string(),
            Self::AmountMismatch { .. } => "Payment amount does not match order".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether a caller may safely retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VerificationUnavailable(_) | Self::Gateway { .. } | Self::DatabaseError(_)
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.response_message();

        if status.is_server_error() {
            tracing::error!(error = %self, retryable = self.is_retryable(), "Request failed");
        }

        let (details, mode) = match &self {
            ServiceError::Gateway { details, mode } => {
                (Some(details.clone()), Some(mode.to_string()))
            }
            _ => (None, None),
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details,
            mode,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

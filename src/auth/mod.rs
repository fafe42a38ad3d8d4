/*!
 * # Authentication
 *
 * Buyers and the store administrator authenticate with HS256 JWTs. The token
 * is read from the `token` cookie set by the storefront, falling back to an
 * `Authorization: Bearer` header for API clients.
 *
 * Buyer tokens carry a `userId` claim; the admin token carries an `email`
 * claim that must equal the configured admin address.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Cookie the storefront stores the session token in
pub const TOKEN_COOKIE: &str = "token";

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Claim structure for JWT tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64, // Issued at time
    pub exp: i64, // Expiration time
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("User not authenticated properly")]
    NotBuyer,

    #[error("Not authorized")]
    NotAdmin,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "AUTH_MISSING_TOKEN"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            Self::NotBuyer => (StatusCode::UNAUTHORIZED, "AUTH_NOT_BUYER"),
            Self::NotAdmin => (StatusCode::UNAUTHORIZED, "AUTH_NOT_ADMIN"),
            Self::TokenCreation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_TOKEN_CREATION_FAILED")
            }
        };
        let message = match &self {
            Self::TokenCreation(_) => "Could not issue token".to_string(),
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct AuthService {
    secret: String,
    admin_email: String,
    token_ttl: Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("admin_email", &self.admin_email)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(secret: impl Into<String>, admin_email: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            admin_email: admin_email.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn issue_buyer_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue(Some(user_id.to_string()), None)
    }

    pub fn issue_admin_token(&self) -> Result<String, AuthError> {
        self.issue(None, Some(self.admin_email.clone()))
    }

    fn issue(&self, user_id: Option<String>, email: Option<String>) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.token_ttl)
            .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;
        let claims = Claims {
            user_id,
            email,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        let has_user = claims.user_id.as_deref().is_some_and(|id| !id.is_empty());
        let has_email = claims.email.as_deref().is_some_and(|e| !e.is_empty());
        if !has_user && !has_email {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn is_admin(&self, claims: &Claims) -> bool {
        !self.admin_email.is_empty()
            && claims
                .email
                .as_deref()
                .is_some_and(|email| email.trim().eq_ignore_ascii_case(self.admin_email.trim()))
    }
}

/// Session token from the `token` cookie, else a bearer header.
fn token_from_parts(parts: &Parts) -> Option<&str> {
    let from_cookie = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

/// Any caller holding a valid token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub is_admin: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let token = token_from_parts(parts).ok_or(AuthError::MissingToken)?;
        let claims = auth.decode(token).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            e
        })?;
        let is_admin = auth.is_admin(&claims);
        Ok(AuthUser { claims, is_admin })
    }
}

/// A signed-in buyer
#[derive(Debug, Clone)]
pub struct BuyerSession {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BuyerSession
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.claims
            .user_id
            .filter(|id| !id.is_empty())
            .map(|user_id| BuyerSession { user_id })
            .ok_or(AuthError::NotBuyer)
    }
}

/// The store administrator
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AuthError::NotAdmin);
        }
        Ok(AdminSession {
            email: user.claims.email.unwrap_or_default(),
        })
    }
}

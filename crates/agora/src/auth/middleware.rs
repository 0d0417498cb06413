//! Optional bearer-token identity.
//!
//! Requests without an `Authorization` header pass through anonymously.
//! Requests with one must carry a valid token.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use super::{AuthConfig, AuthError, Claims, ConfigValidationError};

/// Lifetime of tokens minted by [`AuthState::generate_token`].
const TOKEN_TTL_SECS: i64 = 3600 * 24;

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

struct Keys {
    secret: String,
    decoding: DecodingKey,
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    keys: Option<Arc<Keys>>,
}

impl AuthState {
    /// Create auth state from config, resolving `env:VAR_NAME` secrets.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        let keys = config.resolve_jwt_secret()?.map(|secret| {
            Arc::new(Keys {
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                secret,
            })
        });
        Ok(Self { keys })
    }

    /// Auth state that treats every caller as anonymous.
    pub fn disabled() -> Self {
        Self { keys: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    /// Validate a JWT token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Mint a token for `username`.
    pub fn generate_token(&self, username: &str) -> Result<String, AuthError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            exp: now + TOKEN_TTL_SECS,
            iat: Some(now),
            username: Some(username.to_string()),
            preferred_username: None,
            email: None,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(keys.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

/// Authenticated caller extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    pub fn username(&self) -> &str {
        self.claims.username()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingIdentity)
    }
}

/// `Option<CurrentUser>` is `None` for anonymous callers.
impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Identity middleware.
///
/// Validates an `Authorization: Bearer` token when one is sent and injects
/// `CurrentUser` into request extensions. Without a header, or without a
/// configured secret, the request continues anonymously.
pub async fn identity_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().map_err(|_| AuthError::InvalidAuthHeader))
        .transpose()?;

    if let Some(header) = auth_header {
        if auth.is_enabled() {
            let token = bearer_token_from_header(header)?;
            let claims = auth.validate_token(token)?;
            debug!(username = claims.username(), "authenticated request");
            req.extensions_mut().insert(CurrentUser { claims });
        } else {
            debug!("ignoring authorization header, no JWT secret configured");
        }
    }

    Ok(next.run(req).await)
}

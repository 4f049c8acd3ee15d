use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use slotbook_core::identity::Profile;
use slotbook_core::{CoreError, CoreResult, Identity, IdentityProvider, Role};
use slotbook_shared::Masked;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(identity: &Identity, ttl_seconds: u64) -> Self {
        Self {
            sub: identity.id,
            email: identity.email.inner().clone(),
            name: identity.profile.full_name.clone(),
            role: identity.profile.role,
            exp: expiry_after(Utc::now().timestamp(), ttl_seconds),
        }
    }
}

/// Absolute expiry for a token issued at `now`, clamped instead of wrapping
fn expiry_after(now: i64, ttl_seconds: u64) -> usize {
    let exp = u64::try_from(now).unwrap_or(0).saturating_add(ttl_seconds);
    usize::try_from(exp).unwrap_or(usize::MAX)
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            id: claims.sub,
            email: Masked::new(claims.email),
            profile: Profile { full_name: claims.name, role: claims.role },
        }
    }
}

pub fn issue_token(identity: &Identity, secret: &str, ttl_seconds: u64) -> CoreResult<String> {
    encode(&Header::default(), &Claims::new(identity, ttl_seconds), &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| CoreError::InternalError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Identity provider backed by HS256 bearer tokens
// ============================================================================

pub struct JwtIdentityProvider {
    key: DecodingKey,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()) }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn current_user(&self, credential: &str) -> CoreResult<Identity> {
        let token_data = decode::<Claims>(credential, &self.key, &Validation::default())
            .map_err(|e| CoreError::IdentityError(e.to_string()))?;
        Ok(token_data.claims.into())
    }
}

// ============================================================================
// Middleware
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))
}

async fn resolve_identity(state: &AppState, token: &str) -> Result<Identity, AppError> {
    state.identity.current_user(token).await
        .map_err(|e| AppError::AuthenticationError(e.to_string()))
}

/// Any authenticated caller; the resolved `Identity` lands in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;
    let identity = resolve_identity(&state, &token).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;
    let identity = resolve_identity(&state, &token).await?;
    if !state.identity.is_administrator(&identity) {
        return Err(AppError::AuthorizationError("Administrator role required".to_string()));
    }
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

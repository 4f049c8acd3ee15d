use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use slotbook_core::identity::Profile;
use slotbook_core::{Identity, Role};
use slotbook_shared::Masked;
use crate::{error::AppError, middleware::auth::issue_token, state::AppState};

/// Identity is issued elsewhere in production; this stands in for it locally.
#[derive(Debug, Deserialize)]
pub struct DevTokenRequest {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/dev-token", post(issue_dev_token))
}

async fn issue_dev_token(
    State(state): State<AppState>,
    Json(req): Json<DevTokenRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if !state.auth.allow_dev_tokens {
        return Err(AppError::NotFoundError("Not found".to_string()));
    }
    if req.email.trim().is_empty() {
        return Err(AppError::ValidationError("email is required".to_string()));
    }

    let identity = Identity {
        id: req.user_id.unwrap_or_else(Uuid::new_v4),
        email: Masked::new(req.email.trim().to_string()),
        profile: Profile { full_name: req.name, role: req.role },
    };

    let token = issue_token(&identity, &state.auth.secret, state.auth.expiration)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!("Dev token issued for {} ({:?})", identity.id, identity.profile.role);
    Ok(Json(AuthResponse { token, user_id: identity.id }))
}

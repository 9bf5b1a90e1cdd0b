// handlers/public/auth/login.rs - POST /auth/login/:tenant/:user handler

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

use crate::auth::{generate_jwt, Claims};
use crate::middleware::{request_metadata, ApiResponse, ApiResult};
use crate::security::SecurityContext;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub context: SecurityContext,
}

/// POST /auth/login/:tenant/:user - Open a session and receive a bearer token
///
/// Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 86400,
///     "context": { "tenant_id": "t1", "user_id": "u1", "role": "admin", "security_level": "admin", ... }
///   }
/// }
/// ```
///
/// Fails with 404 for unknown tenants and 401 when the user has no grant.
pub async fn session_login(
    State(state): State<AppState>,
    Path((tenant, user)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<LoginResponse> {
    let metadata = request_metadata(&headers);
    let context = state.sessions.create_context(&tenant, &user, metadata).await?;

    let security = &state.config.security;
    let claims = Claims::for_context(&context, security.jwt_expiry_hours);
    let token = match generate_jwt(&claims, security) {
        Ok(token) => token,
        Err(e) => {
            // The session is useless without a token
            if let Err(logout_err) = state.sessions.logout(&context.session_id).await {
                tracing::warn!("Failed to close untokened session: {}", logout_err);
            }
            return Err(e.into());
        }
    };

    Ok(ApiResponse::created(LoginResponse {
        token,
        expires_in: security.jwt_expiry_hours.saturating_mul(60 * 60),
        context,
    }))
}

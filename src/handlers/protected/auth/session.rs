use axum::extract::{Extension, State};
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::{SecurityContext, SessionRecord};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionRecord,
    /// Seconds until the session lapses without further activity
    pub expires_in: u64,
}

/// GET /api/auth/whoami - The validated context of the caller
pub async fn session_whoami(Extension(context): Extension<SecurityContext>) -> ApiResult<SecurityContext> {
    Ok(ApiResponse::success(context))
}

/// PUT /api/auth/session/refresh - Report the session after its sliding refresh
///
/// The middleware's validation already restarted the session TTL.
pub async fn session_refresh(
    State(state): State<AppState>,
    Extension(context): Extension<SecurityContext>,
) -> ApiResult<SessionResponse> {
    let session = state
        .sessions
        .get_session(&context.session_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or not found"))?;

    Ok(ApiResponse::success(SessionResponse {
        session,
        expires_in: state.sessions.options().session_ttl.as_secs(),
    }))
}

/// DELETE /api/auth/session - Log out; the session turns inactive for good
pub async fn session_logout(
    State(state): State<AppState>,
    Extension(context): Extension<SecurityContext>,
) -> ApiResult<SessionRecord> {
    let session = state.sessions.logout(&context.session_id).await?;
    Ok(ApiResponse::success(session))
}

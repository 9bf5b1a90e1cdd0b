// handlers/protected/security.rs - Tenant security policy

use axum::extract::{Extension, State};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::{require_security_level, SecurityContext, SecurityPolicy};
use crate::server::AppState;
use crate::types::SecurityLevel;

/// GET /api/security/policy - The caller's tenant policy bundle (Admin and above)
pub async fn policy_get(
    State(state): State<AppState>,
    Extension(context): Extension<SecurityContext>,
) -> ApiResult<SecurityPolicy> {
    require_security_level(&context, SecurityLevel::Admin)?;

    let policy = state
        .registry
        .security_policy(&context.tenant_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Tenant '{}' not found", context.tenant_id)))?;

    Ok(ApiResponse::success(policy))
}

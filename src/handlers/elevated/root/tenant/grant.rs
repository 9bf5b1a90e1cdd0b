// handlers/elevated/root/tenant/grant.rs - PUT /api/root/tenants/:tenant/users/:user handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::UserPermissions;
use crate::server::AppState;

/// PUT /api/root/tenants/:tenant/users/:user - Store a user's grant
///
/// Input: `{ "role": "user", "permissions": ["read", "refund"], "cellular_modules": ["billing"] }`
pub async fn tenant_grant(
    State(state): State<AppState>,
    Path((tenant, user)): Path<(String, String)>,
    Json(grant): Json<UserPermissions>,
) -> ApiResult<UserPermissions> {
    if state.registry.get_tenant_config(&tenant).await.is_none() {
        return Err(ApiError::not_found(format!("Tenant '{}' not found", tenant)));
    }

    if grant.role.trim().is_empty() {
        return Err(ApiError::bad_request("Grant role must not be empty"));
    }

    state.directory.grant(&tenant, &user, grant.clone()).await;
    tracing::info!("Stored grant for user '{}' in tenant '{}'", user, tenant);

    Ok(ApiResponse::success(grant))
}

// handlers/elevated/root/tenant/show.rs - GET /api/root/tenants/:tenant handler

use axum::extract::{Path, State};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::TenantConfiguration;
use crate::server::AppState;

/// GET /api/root/tenants/:tenant - Tenant configuration (without its key)
pub async fn tenant_show(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> ApiResult<TenantConfiguration> {
    let config = state
        .registry
        .get_tenant_config(&tenant)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Tenant '{}' not found", tenant)))?;

    Ok(ApiResponse::success(config))
}

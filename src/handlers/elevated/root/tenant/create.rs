// handlers/elevated/root/tenant/create.rs - POST /api/root/tenants handler

use axum::{extract::State, Json};

use crate::middleware::{ApiResponse, ApiResult};
use crate::security::{TenantConfiguration, TenantInitResult};
use crate::server::AppState;

/// POST /api/root/tenants - Onboard a tenant
///
/// Input:
/// ```json
/// {
///   "tenant_id": "acme",
///   "tenant_type": "enterprise",
///   "security_level": "authorized",
///   "data_residency": "south_africa",
///   "compliance_requirements": ["POPIA"],
///   "cellular_modules": ["billing", "inventory"]
/// }
/// ```
///
/// Returns the derived key, module boundaries, isolation parameters and
/// policy bundle. Re-posting an existing tenant re-initializes it and rotates
/// its key.
pub async fn tenant_create(
    State(state): State<AppState>,
    Json(config): Json<TenantConfiguration>,
) -> ApiResult<TenantInitResult> {
    let result = state.registry.initialize_tenant(config).await?;
    Ok(ApiResponse::created(result))
}

// handlers/elevated/root/tenant/list.rs - GET /api/root/tenants handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// GET /api/root/tenants - Ids of every registered tenant
pub async fn tenant_list(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::success(state.registry.tenant_ids().await))
}

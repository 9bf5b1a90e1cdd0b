// handlers/protected/modules.rs - Cellular module listing and lookup

use axum::extract::{Extension, Path, State};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::{ModuleBoundary, SecurityContext};
use crate::server::AppState;

/// GET /api/modules - Boundaries of every module enabled for the caller's tenant
pub async fn modules_list(
    State(state): State<AppState>,
    Extension(context): Extension<SecurityContext>,
) -> ApiResult<Vec<ModuleBoundary>> {
    let boundaries = state
        .registry
        .module_boundaries(&context.tenant_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Tenant '{}' not found", context.tenant_id)))?;

    Ok(ApiResponse::success(boundaries))
}

/// GET /api/modules/:module - One module boundary; requires `read` on that module
pub async fn module_get(
    State(state): State<AppState>,
    Extension(context): Extension<SecurityContext>,
    Path(module): Path<String>,
) -> ApiResult<ModuleBoundary> {
    let boundary = state.sessions.authorize_module(&context, &module, "read").await?;
    Ok(ApiResponse::success(boundary))
}

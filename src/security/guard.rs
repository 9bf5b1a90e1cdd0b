//! Guard checks called at the top of protected operations.
//!
//! Both take the context explicitly and return `PermissionDenied` on failure.

use crate::types::SecurityLevel;

use super::error::SecurityError;
use super::session::SecurityContext;
use super::tenant::ModuleBoundary;

/// Deny unless the context sits at or above `required`
pub fn require_security_level(context: &SecurityContext, required: SecurityLevel) -> Result<(), SecurityError> {
    if context.security_level >= required {
        return Ok(());
    }
    Err(SecurityError::permission_denied(format!(
        "security level {} required, context has {}",
        required, context.security_level
    )))
}

/// Deny unless `permission` is both offered by the module boundary and held
/// by the context.
pub fn require_module_permission(
    context: &SecurityContext,
    boundary: &ModuleBoundary,
    permission: &str,
) -> Result<(), SecurityError> {
    if context.permissions.is_empty() {
        return Err(SecurityError::permission_denied("context carries no permissions"));
    }

    if boundary.tenant_id != context.tenant_id {
        return Err(SecurityError::permission_denied(format!(
            "module namespace '{}' belongs to another tenant",
            boundary.namespace
        )));
    }

    if !boundary.allows(permission) {
        return Err(SecurityError::permission_denied(format!(
            "module '{}' does not offer permission '{}'",
            boundary.module, permission
        )));
    }

    if !context.has_permission(permission) {
        return Err(SecurityError::permission_denied(format!(
            "permission '{}' on module '{}' not granted",
            permission, boundary.module
        )));
    }

    Ok(())
}

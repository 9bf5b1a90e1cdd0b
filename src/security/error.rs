use thiserror::Error;

use crate::cache::CacheError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure kinds surfaced by the tenant registry and the session manager
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Tenant absent. Recoverable, the caller decides the fallback.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Session absent or expired
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Tenant setup failed; the tenant must not be treated as usable
    #[error("Security initialization failed for tenant '{tenant_id}': {source}")]
    Initialization {
        tenant_id: String,
        #[source]
        source: BoxError,
    },

    /// Context creation failed; no context was issued
    #[error("Security context creation failed for user '{user_id}' in tenant '{tenant_id}': {source}")]
    Context {
        tenant_id: String,
        user_id: String,
        #[source]
        source: BoxError,
    },

    /// Guard check failed. Never retried automatically.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Backing cache failed on a point operation
    #[error("Security storage error: {0}")]
    Storage(#[from] CacheError),
}

/// Tenant identifiers rejected at onboarding
#[derive(Debug, Error)]
pub enum InvalidTenantId {
    #[error("Tenant id must be between 2 and 100 characters")]
    Length,

    #[error("Tenant id can only contain letters, numbers, hyphens, and underscores")]
    Charset,
}

impl SecurityError {
    pub fn initialization(tenant_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SecurityError::Initialization {
            tenant_id: tenant_id.into(),
            source: source.into(),
        }
    }

    pub fn context(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        SecurityError::Context {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            source: source.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        SecurityError::PermissionDenied(message.into())
    }

    /// Whether the failure is an ordinary absence rather than a fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecurityError::TenantNotFound(_) | SecurityError::SessionNotFound(_))
    }

    /// Root cause carried by a wrapping kind, if it is itself a SecurityError
    pub fn inner(&self) -> Option<&SecurityError> {
        match self {
            SecurityError::Initialization { source, .. } | SecurityError::Context { source, .. } => {
                source.downcast_ref::<SecurityError>()
            }
            _ => None,
        }
    }
}

//! Tenant security core: tenant registry, session context manager and the
//! guard checks layered on top of validated contexts.

pub mod error;
pub mod guard;
pub mod permissions;
pub mod policy;
pub mod session;
pub mod tenant;

pub use error::{BoxError, InvalidTenantId, SecurityError};
pub use guard::{require_module_permission, require_security_level};
pub use permissions::{DirectoryPermissionSource, PermissionSource, StaticPermissionSource, UserPermissions};
pub use policy::{ComplianceCatalog, SecurityPolicy};
pub use session::{
    derive_security_level, RequestMetadata, SecurityContext, SessionContextManager, SessionOptions, SessionRecord,
};
pub use tenant::{
    IsolationConfig, ModuleBoundary, RegistryOptions, TenantConfiguration, TenantInitResult, TenantRegistry,
    TenantStatus,
};

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{keys, CacheError, CacheStore};
use crate::types::SecurityLevel;

use super::error::{BoxError, SecurityError};
use super::guard;
use super::permissions::{PermissionSource, UserPermissions};
use super::tenant::{ModuleBoundary, TenantRegistry};

/// Caller-supplied request details recorded on the context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Cached login session. Sliding expiry, terminal once inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub active: bool,
}

impl SessionRecord {
    fn new(tenant_id: &str, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: generate_session_id(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            last_activity: now,
            active: true,
        }
    }

    /// Advance last_activity, strictly
    fn touch(&mut self) {
        let now = Utc::now();
        self.last_activity = if now > self.last_activity {
            now
        } else {
            self.last_activity + chrono::Duration::nanoseconds(1)
        };
    }

    fn belongs_to(&self, context: &SecurityContext) -> bool {
        self.tenant_id == context.tenant_id && self.user_id == context.user_id
    }
}

/// Resolved identity, permissions and level for an active session.
/// Derived data: always reconstructible from the session, the registry and
/// the permission source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub security_level: SecurityLevel,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SecurityContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Role/permission content to security level, first match wins
pub fn derive_security_level(role: &str, permissions: &[String]) -> SecurityLevel {
    if role == "super_admin" {
        SecurityLevel::SuperAdmin
    } else if role == "admin" {
        SecurityLevel::Admin
    } else if permissions.iter().any(|p| p == "admin") {
        SecurityLevel::Authorized
    } else if !permissions.is_empty() {
        SecurityLevel::Authenticated
    } else {
        SecurityLevel::Public
    }
}

/// Compare-and-set rounds before logout reports the session as contended
const LOGOUT_ATTEMPTS: usize = 8;

fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Session and context lifetimes. The two expire independently.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub session_ttl: Duration,
    pub context_ttl: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(2 * 60 * 60),
            context_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Mints, caches, validates and refreshes per-request security contexts
pub struct SessionContextManager {
    registry: Arc<TenantRegistry>,
    cache: Arc<dyn CacheStore>,
    permissions: Arc<dyn PermissionSource>,
    options: SessionOptions,
}

impl SessionContextManager {
    pub fn new(
        registry: Arc<TenantRegistry>,
        cache: Arc<dyn CacheStore>,
        permissions: Arc<dyn PermissionSource>,
    ) -> Self {
        Self::with_options(registry, cache, permissions, SessionOptions::default())
    }

    pub fn with_options(
        registry: Arc<TenantRegistry>,
        cache: Arc<dyn CacheStore>,
        permissions: Arc<dyn PermissionSource>,
        options: SessionOptions,
    ) -> Self {
        Self {
            registry,
            cache,
            permissions,
            options,
        }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Open a new session for (tenant, user) and issue its context.
    ///
    /// Every call mints a fresh session; there is no deduplication.
    pub async fn create_context(
        &self,
        tenant_id: &str,
        user_id: &str,
        metadata: RequestMetadata,
    ) -> Result<SecurityContext, SecurityError> {
        match self.try_create(tenant_id, user_id, metadata).await {
            Ok(context) => {
                info!(
                    "Created security context for user '{}' in tenant '{}' at level {}",
                    user_id, tenant_id, context.security_level
                );
                Ok(context)
            }
            Err(e) => {
                warn!(
                    "Security context creation failed for user '{}' in tenant '{}': {}",
                    user_id, tenant_id, e
                );
                Err(SecurityError::context(tenant_id, user_id, e))
            }
        }
    }

    async fn try_create(
        &self,
        tenant_id: &str,
        user_id: &str,
        metadata: RequestMetadata,
    ) -> Result<SecurityContext, BoxError> {
        let grant = self.resolve_grant(tenant_id, user_id).await?;

        let session = SessionRecord::new(tenant_id, user_id);
        let session_key = keys::session(&session.session_id);
        self.cache
            .set_json(&session_key, &session, self.options.session_ttl)
            .await?;

        let context = assemble_context(&session, grant, metadata);
        if let Err(e) = self.store_context(&context).await {
            if let Err(cleanup) = self.cache.delete(&session_key).await {
                warn!("Failed to discard session '{}': {}", session.session_id, cleanup);
            }
            return Err(e.into());
        }

        Ok(context)
    }

    async fn resolve_grant(&self, tenant_id: &str, user_id: &str) -> Result<UserPermissions, BoxError> {
        if self.registry.get_tenant_config(tenant_id).await.is_none() {
            return Err(SecurityError::TenantNotFound(tenant_id.to_string()).into());
        }
        Ok(self.permissions.resolve_permissions(tenant_id, user_id).await?)
    }

    async fn store_context(&self, context: &SecurityContext) -> Result<(), CacheError> {
        self.cache
            .set_json(
                &keys::security_context(&context.session_id),
                context,
                self.options.context_ttl,
            )
            .await
    }

    /// Validate with no level demand
    pub async fn validate_context(&self, context: &SecurityContext) -> bool {
        self.validate_context_at(context, SecurityLevel::Public).await
    }

    /// Affirm or deny a context. Never fails: any internal error denies.
    ///
    /// On success the session's last_activity advances and its TTL restarts.
    pub async fn validate_context_at(&self, context: &SecurityContext, required: SecurityLevel) -> bool {
        match self.try_validate(context, required).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(
                    "Context validation for session '{}' failed closed: {}",
                    context.session_id, e
                );
                false
            }
        }
    }

    async fn try_validate(&self, context: &SecurityContext, required: SecurityLevel) -> Result<bool, BoxError> {
        let key = keys::session(&context.session_id);

        let Some(raw) = self.cache.get(&key).await? else {
            debug!("Session '{}' not found or expired", context.session_id);
            return Ok(false);
        };
        let mut session: SessionRecord = serde_json::from_str(&raw)?;
        if !session.active || !session.belongs_to(context) {
            debug!("Session '{}' inactive or not owned by context", context.session_id);
            return Ok(false);
        }

        if !self
            .permissions
            .can_access_tenant(&context.user_id, &context.tenant_id)
            .await?
        {
            debug!(
                "User '{}' may not access tenant '{}'",
                context.user_id, context.tenant_id
            );
            return Ok(false);
        }

        if context.security_level < required {
            debug!(
                "Context level {} below required {}",
                context.security_level, required
            );
            return Ok(false);
        }

        // Refresh only the record read above; a logout in between wins
        session.touch();
        let refreshed = self
            .cache
            .compare_and_set(&key, &raw, serde_json::to_string(&session)?, self.options.session_ttl)
            .await?;
        if !refreshed {
            debug!("Session '{}' changed during validation", context.session_id);
        }

        Ok(refreshed)
    }

    /// Mark a session inactive. Its remaining TTL is kept.
    ///
    /// Retries when a concurrent validation rewrote the record first.
    pub async fn logout(&self, session_id: &str) -> Result<SessionRecord, SecurityError> {
        let key = keys::session(session_id);

        for _ in 0..LOGOUT_ATTEMPTS {
            let raw = self
                .cache
                .get(&key)
                .await?
                .ok_or_else(|| SecurityError::SessionNotFound(session_id.to_string()))?;
            let mut session: SessionRecord = serde_json::from_str(&raw).map_err(CacheError::from)?;

            session.active = false;
            let ttl = self
                .cache
                .ttl(&key)
                .await?
                .unwrap_or(self.options.session_ttl);
            let updated = serde_json::to_string(&session).map_err(CacheError::from)?;

            if self.cache.compare_and_set(&key, &raw, updated, ttl).await? {
                info!(
                    "Logged out session for user '{}' in tenant '{}'",
                    session.user_id, session.tenant_id
                );
                return Ok(session);
            }
            debug!("Session '{}' changed during logout, retrying", session_id);
        }

        Err(CacheError::Unavailable(format!("session '{}' is contended", session_id)).into())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, SecurityError> {
        Ok(self.cache.get_json(&keys::session(session_id)).await?)
    }

    pub async fn get_context(&self, session_id: &str) -> Result<Option<SecurityContext>, SecurityError> {
        Ok(self.cache.get_json(&keys::security_context(session_id)).await?)
    }

    /// Re-derive and re-cache the context of a live session whose cached
    /// context has expired. Permissions are resolved afresh.
    pub async fn rebuild_context(
        &self,
        session_id: &str,
        metadata: RequestMetadata,
    ) -> Result<SecurityContext, SecurityError> {
        let session = self
            .get_session(session_id)
            .await?
            .filter(|session| session.active)
            .ok_or_else(|| SecurityError::SessionNotFound(session_id.to_string()))?;

        match self.try_rebuild(&session, metadata).await {
            Ok(context) => {
                debug!("Rebuilt security context for session '{}'", session_id);
                Ok(context)
            }
            Err(e) => Err(SecurityError::context(
                session.tenant_id.as_str(),
                session.user_id.as_str(),
                e,
            )),
        }
    }

    async fn try_rebuild(
        &self,
        session: &SessionRecord,
        metadata: RequestMetadata,
    ) -> Result<SecurityContext, BoxError> {
        let grant = self.resolve_grant(&session.tenant_id, &session.user_id).await?;
        let context = assemble_context(session, grant, metadata);
        self.store_context(&context).await?;
        Ok(context)
    }

    /// Context for a session, rebuilt from the session when the cached copy expired
    pub async fn load_context(
        &self,
        session_id: &str,
        metadata: RequestMetadata,
    ) -> Result<SecurityContext, SecurityError> {
        match self.get_context(session_id).await? {
            Some(context) => Ok(context),
            None => self.rebuild_context(session_id, metadata).await,
        }
    }

    /// Check `permission` on `module` against the tenant's boundary and the context
    pub async fn authorize_module(
        &self,
        context: &SecurityContext,
        module: &str,
        permission: &str,
    ) -> Result<ModuleBoundary, SecurityError> {
        let boundary = self
            .registry
            .module_boundary(&context.tenant_id, module)
            .await
            .ok_or_else(|| {
                SecurityError::permission_denied(format!(
                    "module '{}' is not enabled for tenant '{}'",
                    module, context.tenant_id
                ))
            })?;

        guard::require_module_permission(context, &boundary, permission)?;
        Ok(boundary)
    }
}

fn assemble_context(session: &SessionRecord, grant: UserPermissions, metadata: RequestMetadata) -> SecurityContext {
    let security_level = derive_security_level(&grant.role, &grant.permissions);
    SecurityContext {
        tenant_id: session.tenant_id.clone(),
        user_id: session.user_id.clone(),
        role: grant.role,
        permissions: grant.permissions,
        security_level,
        session_id: session.session_id.clone(),
        ip_address: metadata.ip_address,
        user_agent: metadata.user_agent,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::security::DirectoryPermissionSource;
    use crate::testing::{enterprise_tenant, FlakyCache, TestContext};

    fn metadata(ip: &str) -> RequestMetadata {
        RequestMetadata {
            ip_address: Some(ip.to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn security_level_precedence() {
        assert_eq!(derive_security_level("super_admin", &[]), SecurityLevel::SuperAdmin);
        assert_eq!(derive_security_level("admin", &[]), SecurityLevel::Admin);
        assert_eq!(
            derive_security_level("user", &strings(&["read", "admin"])),
            SecurityLevel::Authorized
        );
        assert_eq!(
            derive_security_level("user", &strings(&["read", "write"])),
            SecurityLevel::Authenticated
        );
        assert_eq!(derive_security_level("user", &[]), SecurityLevel::Public);
    }

    #[tokio::test]
    async fn admin_login_on_enterprise_tenant() {
        let ctx = TestContext::memory("admin", &["read", "write", "admin"])
            .with_tenant(enterprise_tenant("t1"))
            .await;

        let config = ctx.registry.get_tenant_config("t1").await.unwrap();
        assert_eq!(config.cellular_modules, vec!["billing"]);

        let context = ctx
            .sessions
            .create_context("t1", "u1", metadata("1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(context.security_level, SecurityLevel::Admin);
        assert_eq!(context.ip_address.as_deref(), Some("1.2.3.4"));
        assert!(ctx.sessions.validate_context(&context).await);

        let cached = ctx.sessions.get_context(&context.session_id).await.unwrap();
        assert_eq!(cached, Some(context));
    }

    #[tokio::test]
    async fn each_call_opens_a_new_session() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;

        let first = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();
        let second = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert!(ctx.sessions.validate_context(&first).await);
        assert!(ctx.sessions.validate_context(&second).await);
    }

    #[tokio::test]
    async fn validation_advances_last_activity() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        let before = ctx.sessions.get_session(&context.session_id).await.unwrap().unwrap();
        assert!(ctx.sessions.validate_context(&context).await);
        let after = ctx.sessions.get_session(&context.session_id).await.unwrap().unwrap();
        assert!(after.last_activity > before.last_activity);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn logged_out_sessions_fail_validation() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        let session = ctx.sessions.logout(&context.session_id).await.unwrap();
        assert!(!session.active);
        assert!(!ctx.sessions.validate_context(&context).await);
        assert!(matches!(
            ctx.sessions.rebuild_context(&context.session_id, RequestMetadata::default()).await,
            Err(SecurityError::SessionNotFound(_))
        ));
    }

    /// Admits everyone, but only after a delay
    struct SlowAccessSource {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl PermissionSource for SlowAccessSource {
        async fn resolve_permissions(&self, _tenant_id: &str, _user_id: &str) -> anyhow::Result<UserPermissions> {
            Ok(UserPermissions::new("user", ["read"]))
        }

        async fn can_access_tenant(&self, _user_id: &str, _tenant_id: &str) -> anyhow::Result<bool> {
            tokio::time::sleep(self.delay).await;
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn logout_during_validation_stays_logged_out() {
        let ctx = TestContext::with_source(
            Arc::new(MemoryCache::new()),
            Arc::new(SlowAccessSource {
                delay: Duration::from_millis(50),
            }),
            SessionOptions::default(),
        )
        .with_tenant(enterprise_tenant("t1"))
        .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        let (validated, logged_out) = tokio::join!(ctx.sessions.validate_context(&context), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ctx.sessions.logout(&context.session_id).await
        });

        assert!(!validated);
        assert!(!logged_out.unwrap().active);

        let session = ctx.sessions.get_session(&context.session_id).await.unwrap().unwrap();
        assert!(!session.active);
        assert!(!ctx.sessions.validate_context(&context).await);
    }

    #[tokio::test]
    async fn logout_of_unknown_session_is_not_found() {
        let ctx = TestContext::memory("user", &["read"]);
        let err = ctx.sessions.logout("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_tenant_wraps_not_found() {
        let ctx = TestContext::memory("admin", &["admin"]);
        let err = ctx
            .sessions
            .create_context("ghost", "u1", RequestMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::Context { .. }));
        assert!(matches!(err.inner(), Some(SecurityError::TenantNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn failed_permission_lookup_caches_nothing() {
        let cache = MemoryCache::new();
        let ctx = TestContext::with_source(
            Arc::new(cache.clone()),
            Arc::new(DirectoryPermissionSource::new()),
            SessionOptions::default(),
        )
        .with_tenant(enterprise_tenant("t1"))
        .await;
        let tenant_entries = cache.len().await;

        let err = ctx
            .sessions
            .create_context("t1", "stranger", RequestMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::Context { .. }));
        assert_eq!(cache.len().await, tenant_entries);
    }

    #[tokio::test]
    async fn failed_context_write_discards_the_session() {
        let memory = MemoryCache::new();
        let flaky = Arc::new(FlakyCache::new(memory.clone()));
        let ctx = TestContext::new(flaky.clone(), UserPermissions::new("user", ["read"]))
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let tenant_entries = memory.len().await;

        // session write succeeds, context write fails
        flaky.set_write_quota(1);
        let err = ctx
            .sessions
            .create_context("t1", "u1", RequestMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::Context { .. }));
        assert_eq!(memory.len().await, tenant_entries);
    }

    #[tokio::test]
    async fn validation_fails_closed_on_cache_errors() {
        let flaky = Arc::new(FlakyCache::new(MemoryCache::new()));
        let ctx = TestContext::new(flaky.clone(), UserPermissions::new("user", ["read"]))
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        flaky.fail_reads(true);
        assert!(!ctx.sessions.validate_context(&context).await);

        flaky.fail_reads(false);
        assert!(ctx.sessions.validate_context(&context).await);
    }

    #[tokio::test]
    async fn context_must_match_its_session_owner() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        let mut forged = context.clone();
        forged.user_id = "u2".to_string();
        assert!(!ctx.sessions.validate_context(&forged).await);
    }

    #[tokio::test]
    async fn level_demand_is_enforced() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();
        assert_eq!(context.security_level, SecurityLevel::Authenticated);

        assert!(ctx.sessions.validate_context_at(&context, SecurityLevel::Authenticated).await);
        assert!(!ctx.sessions.validate_context_at(&context, SecurityLevel::Admin).await);
    }

    #[tokio::test]
    async fn revoked_tenant_access_denies_validation() {
        let directory = Arc::new(DirectoryPermissionSource::new());
        directory
            .grant("t1", "u1", UserPermissions::new("user", ["read"]))
            .await;
        let ctx = TestContext::with_source(
            Arc::new(MemoryCache::new()),
            directory.clone(),
            SessionOptions::default(),
        )
        .with_tenant(enterprise_tenant("t1"))
        .await;

        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();
        assert!(ctx.sessions.validate_context(&context).await);

        directory.revoke("t1", "u1").await;
        assert!(!ctx.sessions.validate_context(&context).await);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_slides_the_session_expiry() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(90 * 60)).await;
        assert!(ctx.sessions.validate_context(&context).await);

        tokio::time::advance(Duration::from_secs(90 * 60)).await;
        assert!(ctx.sessions.validate_context(&context).await);

        tokio::time::advance(Duration::from_secs(121 * 60)).await;
        assert!(!ctx.sessions.validate_context(&context).await);
    }

    #[tokio::test(start_paused = true)]
    async fn context_can_expire_before_its_session() {
        let ctx = TestContext::memory("user", &["read"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(61 * 60)).await;
        assert!(ctx.sessions.get_context(&context.session_id).await.unwrap().is_none());
        assert!(ctx.sessions.get_session(&context.session_id).await.unwrap().is_some());
        assert!(ctx.sessions.validate_context(&context).await);

        let rebuilt = ctx
            .sessions
            .load_context(&context.session_id, metadata("10.0.0.2"))
            .await
            .unwrap();
        assert_eq!(rebuilt.session_id, context.session_id);
        assert_eq!(rebuilt.ip_address.as_deref(), Some("10.0.0.2"));
        assert!(ctx.sessions.get_context(&context.session_id).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn context_can_outlive_its_session() {
        let options = SessionOptions {
            session_ttl: Duration::from_secs(10 * 60),
            context_ttl: Duration::from_secs(60 * 60),
        };
        let ctx = TestContext::with_source(
            Arc::new(MemoryCache::new()),
            Arc::new(crate::security::StaticPermissionSource::default()),
            options,
        )
        .with_tenant(enterprise_tenant("t1"))
        .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(11 * 60)).await;
        assert!(ctx.sessions.get_session(&context.session_id).await.unwrap().is_none());
        assert!(ctx.sessions.get_context(&context.session_id).await.unwrap().is_some());
        assert!(!ctx.sessions.validate_context(&context).await);
    }

    #[tokio::test]
    async fn module_authorization_intersects_boundary_and_context() {
        let ctx = TestContext::memory("user", &["read", "refund"])
            .with_tenant(enterprise_tenant("t1"))
            .await;
        let context = ctx.sessions.create_context("t1", "u1", metadata("10.0.0.1")).await.unwrap();

        let boundary = ctx.sessions.authorize_module(&context, "billing", "refund").await.unwrap();
        assert_eq!(boundary.namespace, "t1:billing");

        for (module, permission) in [("billing", "payment_process"), ("billing", "fly"), ("crm", "read")] {
            let err = ctx
                .sessions
                .authorize_module(&context, module, permission)
                .await
                .unwrap_err();
            assert!(matches!(err, SecurityError::PermissionDenied(_)), "{} {}", module, permission);
        }
    }
}

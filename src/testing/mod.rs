use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CacheStore, MemoryCache};
use crate::security::{
    PermissionSource, SessionContextManager, SessionOptions, StaticPermissionSource, TenantConfiguration,
    TenantRegistry, UserPermissions,
};
use crate::types::{SecurityLevel, TenantType};

/// MemoryCache wrapper that can be told to fail
pub struct FlakyCache {
    inner: MemoryCache,
    writes_left: AtomicUsize,
    reads_fail: AtomicBool,
}

impl FlakyCache {
    pub fn new(inner: MemoryCache) -> Self {
        Self::with_write_quota(inner, usize::MAX)
    }

    /// Accept `writes` successful writes, then fail every write
    pub fn with_write_quota(inner: MemoryCache, writes: usize) -> Self {
        Self {
            inner,
            writes_left: AtomicUsize::new(writes),
            reads_fail: AtomicBool::new(false),
        }
    }

    pub fn set_write_quota(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    fn take_write(&self) -> Result<(), CacheError> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| CacheError::Unavailable("write quota exhausted".to_string()))
    }

    fn check_read(&self) -> Result<(), CacheError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_read()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.take_write()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.inner.expire(key, ttl).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.take_write()?;
        self.inner.compare_and_set(key, expected, value, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.check_read()?;
        self.inner.ttl(key).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check_read()
    }
}

/// Enterprise tenant with billing enabled
pub fn enterprise_tenant(tenant_id: &str) -> TenantConfiguration {
    TenantConfiguration::new(tenant_id, TenantType::Enterprise, SecurityLevel::Authorized)
        .with_modules(["billing"])
}

/// Registry + session manager over a shared cache, with a static permission source
pub struct TestContext {
    pub cache: Arc<dyn CacheStore>,
    pub registry: Arc<TenantRegistry>,
    pub sessions: SessionContextManager,
}

impl TestContext {
    pub fn new(cache: Arc<dyn CacheStore>, grant: UserPermissions) -> Self {
        Self::with_source(cache, Arc::new(StaticPermissionSource::new(grant)), SessionOptions::default())
    }

    pub fn with_source(
        cache: Arc<dyn CacheStore>,
        permissions: Arc<dyn PermissionSource>,
        options: SessionOptions,
    ) -> Self {
        let registry = Arc::new(TenantRegistry::new(cache.clone()));
        let sessions = SessionContextManager::with_options(registry.clone(), cache.clone(), permissions, options);
        Self {
            cache,
            registry,
            sessions,
        }
    }

    /// Memory-backed context whose users all resolve to `role` with `permissions`
    pub fn memory(role: &str, permissions: &[&str]) -> Self {
        Self::new(
            Arc::new(MemoryCache::new()),
            UserPermissions::new(role, permissions.iter().copied()),
        )
    }

    pub async fn with_tenant(self, config: TenantConfiguration) -> Self {
        self.registry
            .initialize_tenant(config)
            .await
            .expect("tenant initialization");
        self
    }
}

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{keys, CacheStore};
use crate::types::{SecurityLevel, TenantType};

use super::error::{BoxError, InvalidTenantId, SecurityError};
use super::policy::{self, ComplianceCatalog, SecurityPolicy};

/// Residency tags that keep processing inside the jurisdiction
pub const LOCAL_PROCESSING_REGIONS: &[&str] = &["south_africa", "nigeria", "kenya"];

/// Per-tenant configuration, created once at onboarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfiguration {
    pub tenant_id: String,
    pub tenant_type: TenantType,
    pub security_level: SecurityLevel,
    /// Derived at initialization; never serialized
    #[serde(default, skip_serializing)]
    pub encryption_key: Option<String>,
    #[serde(default)]
    pub data_residency: Option<String>,
    #[serde(default)]
    pub compliance_requirements: Vec<String>,
    #[serde(default)]
    pub cellular_modules: Vec<String>,
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    /// Bytes
    #[serde(default = "default_storage_quota")]
    pub storage_quota: u64,
    /// Requests per minute
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_max_users() -> u32 {
    100
}

fn default_storage_quota() -> u64 {
    10 * 1024 * 1024 * 1024 // 10GB
}

fn default_api_rate_limit() -> u32 {
    1000
}

impl TenantConfiguration {
    pub fn new(tenant_id: impl Into<String>, tenant_type: TenantType, security_level: SecurityLevel) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_type,
            security_level,
            encryption_key: None,
            data_residency: None,
            compliance_requirements: Vec::new(),
            cellular_modules: Vec::new(),
            max_users: default_max_users(),
            storage_quota: default_storage_quota(),
            api_rate_limit: default_api_rate_limit(),
        }
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cellular_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.cellular_modules.iter().any(|m| m == module)
    }

    fn redacted(&self) -> Self {
        Self {
            encryption_key: None,
            ..self.clone()
        }
    }
}

/// Access-control and rate-limit descriptor for one (tenant, module) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleBoundary {
    pub tenant_id: String,
    pub module: String,
    /// `{tenant_id}:{module}`
    pub namespace: String,
    pub permissions: BTreeSet<String>,
    /// Requests per minute, keyed by permission
    pub rate_limits: BTreeMap<String, u32>,
}

impl ModuleBoundary {
    pub fn derive(tenant_id: &str, module: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            module: module.to_string(),
            namespace: keys::module_namespace(tenant_id, module),
            permissions: policy::module_permissions(module),
            rate_limits: policy::module_rate_limits(module),
        }
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn rate_limit(&self, permission: &str) -> Option<u32> {
        self.rate_limits.get(permission).copied()
    }
}

/// Storage and processing isolation parameters for a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationConfig {
    pub storage_prefix: String,
    pub cache_namespace: String,
    pub database_schema: String,
    pub encryption_at_rest: bool,
    pub local_data_processing: bool,
    pub cross_border_restrictions: bool,
}

impl IsolationConfig {
    pub fn derive(config: &TenantConfiguration) -> Self {
        let local = config
            .data_residency
            .as_deref()
            .map(|region| LOCAL_PROCESSING_REGIONS.contains(&region))
            .unwrap_or(false);

        Self {
            storage_prefix: format!("tenant_{}/", config.tenant_id),
            cache_namespace: format!("tenant:{}", config.tenant_id),
            database_schema: format!("tenant_{}", config.tenant_id.replace('-', "_")),
            encryption_at_rest: true,
            local_data_processing: local,
            cross_border_restrictions: local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Initialized,
}

/// Everything produced by onboarding a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantInitResult {
    pub tenant_id: String,
    pub tenant_key: String,
    pub boundaries: BTreeMap<String, ModuleBoundary>,
    pub isolation: IsolationConfig,
    pub policy: SecurityPolicy,
    pub status: TenantStatus,
}

/// Registry tuning; defaults follow the reference policy
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub tenant_config_ttl: Duration,
    pub tenant_key_ttl: Duration,
    pub module_boundary_ttl: Duration,
    /// Process-wide secret mixed into tenant keys; random when unset
    pub master_secret: Option<String>,
    pub compliance: ComplianceCatalog,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            tenant_config_ttl: Duration::from_secs(60 * 60),
            tenant_key_ttl: Duration::from_secs(24 * 60 * 60),
            module_boundary_ttl: Duration::from_secs(60 * 60),
            master_secret: None,
            compliance: ComplianceCatalog::default(),
        }
    }
}

/// Owns tenant configuration and every tenant-scoped policy artifact
pub struct TenantRegistry {
    cache: Arc<dyn CacheStore>,
    tenants: RwLock<HashMap<String, TenantConfiguration>>,
    master_secret: Vec<u8>,
    options: RegistryOptions,
}

impl TenantRegistry {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self::with_options(cache, RegistryOptions::default())
    }

    pub fn with_options(cache: Arc<dyn CacheStore>, options: RegistryOptions) -> Self {
        let master_secret = match options.master_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
            _ => {
                let mut secret = vec![0u8; 32];
                rand::rng().fill_bytes(&mut secret);
                secret
            }
        };

        Self {
            cache,
            tenants: RwLock::new(HashMap::new()),
            master_secret,
            options,
        }
    }

    /// Onboard (or re-initialize) a tenant.
    ///
    /// Cache entries are written key first, boundaries next, configuration
    /// last; the in-memory map only changes once all of them landed.
    pub async fn initialize_tenant(
        &self,
        config: TenantConfiguration,
    ) -> Result<TenantInitResult, SecurityError> {
        let tenant_id = config.tenant_id.clone();

        match self.try_initialize(config).await {
            Ok(result) => {
                info!(
                    "Initialized tenant '{}' with {} cellular modules",
                    result.tenant_id,
                    result.boundaries.len()
                );
                Ok(result)
            }
            Err(e) => {
                error!("Failed to initialize tenant '{}': {}", tenant_id, e);
                Err(SecurityError::initialization(tenant_id, e))
            }
        }
    }

    async fn try_initialize(&self, mut config: TenantConfiguration) -> Result<TenantInitResult, BoxError> {
        validate_tenant_id(&config.tenant_id)?;

        let tenant_id = config.tenant_id.clone();
        let tenant_key = self.generate_tenant_key(&tenant_id);

        for module in config.cellular_modules.iter().filter(|m| !policy::is_known_module(m)) {
            debug!(
                "Module '{}' for tenant '{}' has no table entry, using default boundary",
                module, tenant_id
            );
        }

        let boundaries: BTreeMap<String, ModuleBoundary> = config
            .cellular_modules
            .iter()
            .map(|module| (module.clone(), ModuleBoundary::derive(&tenant_id, module)))
            .collect();
        let isolation = IsolationConfig::derive(&config);
        let policy = policy::derive_policy(&config, &self.options.compliance);

        let previous = self.get_tenant_config(&tenant_id).await;

        let mut written: Vec<String> = Vec::new();
        if let Err(e) = self
            .persist(&config, &tenant_key, &boundaries, &mut written)
            .await
        {
            self.rollback(&written).await;
            return Err(e.into());
        }

        if let Some(previous) = previous {
            self.discard_stale_boundaries(&previous, &config).await;
        }

        config.encryption_key = Some(tenant_key.clone());
        self.tenants.write().await.insert(tenant_id.clone(), config);

        Ok(TenantInitResult {
            tenant_id,
            tenant_key,
            boundaries,
            isolation,
            policy,
            status: TenantStatus::Initialized,
        })
    }

    async fn persist(
        &self,
        config: &TenantConfiguration,
        tenant_key: &str,
        boundaries: &BTreeMap<String, ModuleBoundary>,
        written: &mut Vec<String>,
    ) -> Result<(), crate::cache::CacheError> {
        let tenant_id = &config.tenant_id;

        let key = keys::tenant_key(tenant_id);
        self.cache
            .set(&key, tenant_key.to_string(), self.options.tenant_key_ttl)
            .await?;
        written.push(key);

        for (module, boundary) in boundaries {
            let key = keys::module_boundary(tenant_id, module);
            self.cache
                .set_json(&key, boundary, self.options.module_boundary_ttl)
                .await?;
            written.push(key);
        }

        let key = keys::tenant_config(tenant_id);
        self.cache
            .set_json(&key, &config.redacted(), self.options.tenant_config_ttl)
            .await?;
        written.push(key);

        Ok(())
    }

    /// Drop cached boundaries of modules a re-initialization disabled
    async fn discard_stale_boundaries(&self, previous: &TenantConfiguration, current: &TenantConfiguration) {
        for module in previous
            .cellular_modules
            .iter()
            .filter(|module| !current.has_module(module))
        {
            let key = keys::module_boundary(&current.tenant_id, module);
            match self.cache.delete(&key).await {
                Ok(_) => debug!("Discarded boundary '{}' of disabled module", key),
                Err(e) => warn!("Failed to discard module boundary '{}': {}", key, e),
            }
        }
    }

    async fn rollback(&self, written: &[String]) {
        for key in written {
            if let Err(e) = self.cache.delete(key).await {
                warn!("Failed to roll back cache entry '{}': {}", key, e);
            }
        }
    }

    /// Tenant configuration, cache first with in-memory fallback.
    /// Absence is an ordinary outcome. The encryption key is never included.
    pub async fn get_tenant_config(&self, tenant_id: &str) -> Option<TenantConfiguration> {
        match self
            .cache
            .get_json::<TenantConfiguration>(&keys::tenant_config(tenant_id))
            .await
        {
            Ok(Some(config)) => return Some(config),
            Ok(None) => debug!("Tenant config cache miss for '{}'", tenant_id),
            Err(e) => warn!("Tenant config cache lookup failed for '{}': {}", tenant_id, e),
        }

        self.tenants
            .read()
            .await
            .get(tenant_id)
            .map(TenantConfiguration::redacted)
    }

    /// Tenant encryption key (hex digest), cache first with in-memory fallback
    pub async fn encryption_key(&self, tenant_id: &str) -> Option<String> {
        match self.cache.get(&keys::tenant_key(tenant_id)).await {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {}
            Err(e) => warn!("Tenant key cache lookup failed for '{}': {}", tenant_id, e),
        }

        self.tenants
            .read()
            .await
            .get(tenant_id)
            .and_then(|config| config.encryption_key.clone())
    }

    /// Boundary for an enabled module; recomputed when the cached copy expired.
    /// A module the current configuration does not enable has no boundary,
    /// whatever the cache still holds.
    pub async fn module_boundary(&self, tenant_id: &str, module: &str) -> Option<ModuleBoundary> {
        let config = self.get_tenant_config(tenant_id).await?;
        if !config.has_module(module) {
            return None;
        }

        let key = keys::module_boundary(tenant_id, module);
        match self.cache.get_json::<ModuleBoundary>(&key).await {
            Ok(Some(boundary)) => return Some(boundary),
            Ok(None) => {}
            Err(e) => warn!("Module boundary cache lookup failed for '{}': {}", key, e),
        }

        let boundary = ModuleBoundary::derive(tenant_id, module);
        if let Err(e) = self
            .cache
            .set_json(&key, &boundary, self.options.module_boundary_ttl)
            .await
        {
            warn!("Failed to re-cache module boundary '{}': {}", key, e);
        }
        Some(boundary)
    }

    /// Boundaries for every module the tenant has enabled, in configured order
    pub async fn module_boundaries(&self, tenant_id: &str) -> Option<Vec<ModuleBoundary>> {
        let config = self.get_tenant_config(tenant_id).await?;
        let mut boundaries = Vec::with_capacity(config.cellular_modules.len());
        for module in &config.cellular_modules {
            if let Some(boundary) = self.module_boundary(tenant_id, module).await {
                boundaries.push(boundary);
            }
        }
        Some(boundaries)
    }

    /// Policy bundle recomputed from the current configuration
    pub async fn security_policy(&self, tenant_id: &str) -> Option<SecurityPolicy> {
        let config = self.get_tenant_config(tenant_id).await?;
        Some(policy::derive_policy(&config, &self.options.compliance))
    }

    /// Compliance tags that contribute a policy block
    pub fn compliance_tags(&self) -> Vec<&str> {
        self.options.compliance.tags()
    }

    pub async fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// sha256(tenant id || process secret || now), hex encoded
    fn generate_tenant_key(&self, tenant_id: &str) -> String {
        let now = Utc::now();
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_bytes());
        hasher.update(&self.master_secret);
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

pub fn validate_tenant_id(tenant_id: &str) -> Result<(), InvalidTenantId> {
    if tenant_id.len() < 2 || tenant_id.len() > 100 {
        return Err(InvalidTenantId::Length);
    }

    if !tenant_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(InvalidTenantId::Charset);
    }

    Ok(())
}

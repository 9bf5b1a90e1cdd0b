//! Tenant policy derivation.
//!
//! Everything here is a pure function of the tenant configuration; the
//! registry decides what gets cached.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{SecurityLevel, TenantType};

use super::tenant::TenantConfiguration;

pub const ENCRYPTION_ALGORITHM: &str = "AES-256-GCM";
pub const KEY_ROTATION_DAYS: u32 = 90;
pub const AUDIT_RETENTION_DAYS: u32 = 2555;

/// Permissions granted to modules missing from the table
pub const DEFAULT_MODULE_PERMISSIONS: &[&str] = &["read", "write"];

/// Rate ceilings (requests per minute) for modules missing from the table
pub const DEFAULT_MODULE_RATE_LIMITS: &[(&str, u32)] = &[("read", 100), ("write", 50)];

static MODULE_PERMISSIONS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("billing", &["read", "write", "payment_process", "refund"][..]),
        ("crm", &["read", "write", "delete", "export"][..]),
        ("inventory", &["read", "write", "stock_adjust", "transfer"][..]),
        ("analytics", &["read", "export"][..]),
        ("hr", &["read", "write", "payroll_access"][..]),
        ("ecommerce", &["read", "write", "order_process", "refund"][..]),
    ])
});

static MODULE_RATE_LIMITS: Lazy<HashMap<&'static str, &'static [(&'static str, u32)]>> = Lazy::new(|| {
    HashMap::from([
        (
            "billing",
            &[("read", 100), ("write", 20), ("payment_process", 10), ("refund", 5)][..],
        ),
        (
            "crm",
            &[("read", 200), ("write", 100), ("delete", 10), ("export", 5)][..],
        ),
        (
            "inventory",
            &[("read", 200), ("write", 100), ("stock_adjust", 50), ("transfer", 20)][..],
        ),
        ("analytics", &[("read", 50), ("export", 5)][..]),
        ("hr", &[("read", 50), ("write", 20), ("payroll_access", 5)][..]),
        (
            "ecommerce",
            &[("read", 300), ("write", 100), ("order_process", 60), ("refund", 5)][..],
        ),
    ])
});

/// Allowed permission set for a module kind
pub fn module_permissions(module: &str) -> BTreeSet<String> {
    MODULE_PERMISSIONS
        .get(module)
        .copied()
        .unwrap_or(DEFAULT_MODULE_PERMISSIONS)
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Per-permission requests-per-minute ceilings for a module kind
pub fn module_rate_limits(module: &str) -> BTreeMap<String, u32> {
    MODULE_RATE_LIMITS
        .get(module)
        .copied()
        .unwrap_or(DEFAULT_MODULE_RATE_LIMITS)
        .iter()
        .map(|(permission, limit)| (permission.to_string(), *limit))
        .collect()
}

pub fn is_known_module(module: &str) -> bool {
    MODULE_PERMISSIONS.contains_key(module)
}

pub fn session_timeout_minutes(tenant_type: TenantType) -> u32 {
    match tenant_type {
        TenantType::Individual => 120,
        TenantType::SmallBusiness => 240,
        TenantType::Enterprise => 480,
        TenantType::Government => 60,
        TenantType::Ngo => 180,
        _ => 120,
    }
}

pub fn concurrent_sessions(tenant_type: TenantType) -> u32 {
    match tenant_type {
        TenantType::Individual => 3,
        TenantType::SmallBusiness => 10,
        TenantType::Enterprise => 100,
        TenantType::Government => 50,
        TenantType::Ngo => 20,
        _ => 3,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: u8,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_symbols: bool,
    pub prevent_reuse: u8,
    pub max_age_days: u16,
}

impl PasswordPolicy {
    /// Three complexity tiers keyed by security level
    pub fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Public | SecurityLevel::Authenticated => Self {
                min_length: 8,
                require_uppercase: true,
                require_lowercase: true,
                require_numbers: true,
                require_symbols: false,
                prevent_reuse: 3,
                max_age_days: 180,
            },
            SecurityLevel::Authorized => Self {
                min_length: 10,
                require_uppercase: true,
                require_lowercase: true,
                require_numbers: true,
                require_symbols: true,
                prevent_reuse: 5,
                max_age_days: 90,
            },
            SecurityLevel::Admin | SecurityLevel::SuperAdmin => Self {
                min_length: 12,
                require_uppercase: true,
                require_lowercase: true,
                require_numbers: true,
                require_symbols: true,
                prevent_reuse: 10,
                max_age_days: 60,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationPolicy {
    pub multi_factor_required: bool,
    pub password_policy: PasswordPolicy,
    pub session_timeout_minutes: u32,
    pub concurrent_sessions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProtectionPolicy {
    pub encryption_algorithm: String,
    pub key_rotation_days: u32,
    pub pii_detection: bool,
    pub data_masking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPolicy {
    pub log_all_access: bool,
    pub log_data_changes: bool,
    pub retention_days: u32,
    pub encrypted_logs: bool,
}

/// Named policy flags contributed by one compliance tag
pub type ComplianceBlock = BTreeMap<String, bool>;

/// The full policy bundle derived for a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub authentication: AuthenticationPolicy,
    pub data_protection: DataProtectionPolicy,
    pub audit: AuditPolicy,
    /// Keyed by compliance tag; only tags known to the catalog appear
    pub compliance: BTreeMap<String, ComplianceBlock>,
}

/// Open mapping from compliance tag to the policy block it adds.
#[derive(Debug, Clone)]
pub struct ComplianceCatalog {
    blocks: HashMap<String, ComplianceBlock>,
}

impl Default for ComplianceCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register(
            "GDPR",
            [("right_to_erasure", true), ("data_portability", true), ("consent_management", true)],
        );
        catalog.register(
            "POPIA",
            [("data_minimization", true), ("purpose_limitation", true), ("storage_limitation", true)],
        );
        catalog
    }
}

impl ComplianceCatalog {
    pub fn empty() -> Self {
        Self { blocks: HashMap::new() }
    }

    /// Add or replace the block for a tag
    pub fn register<I, K>(&mut self, tag: impl Into<String>, flags: I)
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        let block = flags.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.blocks.insert(tag.into(), block);
    }

    pub fn block_for(&self, tag: &str) -> Option<&ComplianceBlock> {
        self.blocks.get(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// Derive the policy bundle for a tenant configuration
pub fn derive_policy(config: &TenantConfiguration, catalog: &ComplianceCatalog) -> SecurityPolicy {
    let authentication = AuthenticationPolicy {
        multi_factor_required: config.security_level.requires_mfa(),
        password_policy: PasswordPolicy::for_level(config.security_level),
        session_timeout_minutes: session_timeout_minutes(config.tenant_type),
        concurrent_sessions: concurrent_sessions(config.tenant_type),
    };

    let data_protection = DataProtectionPolicy {
        encryption_algorithm: ENCRYPTION_ALGORITHM.to_string(),
        key_rotation_days: KEY_ROTATION_DAYS,
        pii_detection: true,
        data_masking: true,
    };

    let audit = AuditPolicy {
        log_all_access: true,
        log_data_changes: true,
        retention_days: AUDIT_RETENTION_DAYS,
        encrypted_logs: true,
    };

    let mut compliance = BTreeMap::new();
    for tag in &config.compliance_requirements {
        match catalog.block_for(tag) {
            Some(block) => {
                compliance.insert(tag.clone(), block.clone());
            }
            None => tracing::debug!("No compliance block registered for tag '{}'", tag),
        }
    }

    SecurityPolicy {
        authentication,
        data_protection,
        audit,
        compliance,
    }
}

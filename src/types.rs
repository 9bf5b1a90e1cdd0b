/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Kind of organisation a tenant represents.
/// Drives session-timeout and concurrent-session defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Individual,
    SmallBusiness,
    Enterprise,
    Government,
    Ngo,
    Cooperative,
}

/// Ordered privilege tier used for coarse-grained authorization gating.
///
/// Variant order is significant: `Public < Authenticated < Authorized < Admin < SuperAdmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Public,
    Authenticated,
    Authorized,
    Admin,
    SuperAdmin,
}

impl SecurityLevel {
    /// Multi-factor authentication is mandatory from Admin upwards
    pub fn requires_mfa(&self) -> bool {
        *self >= SecurityLevel::Admin
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SecurityLevel::Public => "public",
            SecurityLevel::Authenticated => "authenticated",
            SecurityLevel::Authorized => "authorized",
            SecurityLevel::Admin => "admin",
            SecurityLevel::SuperAdmin => "super_admin",
        };
        f.write_str(name)
    }
}

//! Cache key namespace shared with any collaborating store.
//!
//! Each prefix belongs to exactly one owner; the registry writes the tenant
//! prefixes and the session manager writes the session prefixes.

pub const TENANT_CONFIG: &str = "tenant_config";
pub const TENANT_KEY: &str = "tenant_key";
pub const MODULE_BOUNDARY: &str = "module_boundary";
pub const SESSION: &str = "session";
pub const SECURITY_CONTEXT: &str = "security_context";

pub fn tenant_config(tenant_id: &str) -> String {
    format!("{}:{}", TENANT_CONFIG, tenant_id)
}

pub fn tenant_key(tenant_id: &str) -> String {
    format!("{}:{}", TENANT_KEY, tenant_id)
}

pub fn module_boundary(tenant_id: &str, module: &str) -> String {
    format!("{}:{}", MODULE_BOUNDARY, module_namespace(tenant_id, module))
}

pub fn session(session_id: &str) -> String {
    format!("{}:{}", SESSION, session_id)
}

pub fn security_context(session_id: &str) -> String {
    format!("{}:{}", SECURITY_CONTEXT, session_id)
}

/// Isolation key for all module-scoped storage and cache lookups
pub fn module_namespace(tenant_id: &str, module: &str) -> String {
    format!("{}:{}", tenant_id, module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_namespace_table() {
        assert_eq!(tenant_config("t1"), "tenant_config:t1");
        assert_eq!(tenant_key("t1"), "tenant_key:t1");
        assert_eq!(module_boundary("t1", "billing"), "module_boundary:t1:billing");
        assert_eq!(session("abc"), "session:abc");
        assert_eq!(security_context("abc"), "security_context:abc");
    }
}

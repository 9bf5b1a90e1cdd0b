use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What a permission source knows about one user inside one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub cellular_modules: Vec<String>,
}

impl UserPermissions {
    pub fn new<I, S>(role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            cellular_modules: Vec::new(),
        }
    }
}

/// Pluggable identity collaborator consulted by the session manager
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn resolve_permissions(&self, tenant_id: &str, user_id: &str) -> anyhow::Result<UserPermissions>;

    async fn can_access_tenant(&self, user_id: &str, tenant_id: &str) -> anyhow::Result<bool>;
}

/// Answers every lookup with the same grant and admits every user to every tenant
#[derive(Debug, Clone)]
pub struct StaticPermissionSource {
    grant: UserPermissions,
}

impl StaticPermissionSource {
    pub fn new(grant: UserPermissions) -> Self {
        Self { grant }
    }
}

impl Default for StaticPermissionSource {
    fn default() -> Self {
        Self::new(UserPermissions::new("admin", ["read", "write", "admin"]))
    }
}

#[async_trait]
impl PermissionSource for StaticPermissionSource {
    async fn resolve_permissions(&self, _tenant_id: &str, _user_id: &str) -> anyhow::Result<UserPermissions> {
        Ok(self.grant.clone())
    }

    async fn can_access_tenant(&self, _user_id: &str, _tenant_id: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Grant table keyed by (tenant, user).
/// A user without a grant in a tenant cannot resolve permissions there.
#[derive(Default)]
pub struct DirectoryPermissionSource {
    grants: RwLock<HashMap<(String, String), UserPermissions>>,
}

impl DirectoryPermissionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, tenant_id: &str, user_id: &str, permissions: UserPermissions) {
        let mut grants = self.grants.write().await;
        grants.insert((tenant_id.to_string(), user_id.to_string()), permissions);
    }

    pub async fn revoke(&self, tenant_id: &str, user_id: &str) -> bool {
        let mut grants = self.grants.write().await;
        grants
            .remove(&(tenant_id.to_string(), user_id.to_string()))
            .is_some()
    }
}

#[async_trait]
impl PermissionSource for DirectoryPermissionSource {
    async fn resolve_permissions(&self, tenant_id: &str, user_id: &str) -> anyhow::Result<UserPermissions> {
        let grants = self.grants.read().await;
        grants
            .get(&(tenant_id.to_string(), user_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no grant for user '{}' in tenant '{}'", user_id, tenant_id))
    }

    async fn can_access_tenant(&self, user_id: &str, tenant_id: &str) -> anyhow::Result<bool> {
        let grants = self.grants.read().await;
        Ok(grants.contains_key(&(tenant_id.to_string(), user_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_only_answers_for_granted_pairs() {
        let directory = DirectoryPermissionSource::new();
        directory
            .grant("t1", "u1", UserPermissions::new("user", ["read"]))
            .await;

        let grant = directory.resolve_permissions("t1", "u1").await.unwrap();
        assert_eq!(grant.role, "user");
        assert!(directory.can_access_tenant("u1", "t1").await.unwrap());

        assert!(directory.resolve_permissions("t2", "u1").await.is_err());
        assert!(!directory.can_access_tenant("u1", "t2").await.unwrap());

        assert!(directory.revoke("t1", "u1").await);
        assert!(!directory.can_access_tenant("u1", "t1").await.unwrap());
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::security::{RegistryOptions, SessionOptions};

/// Longest bearer token lifetime accepted from the environment (one year)
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

/// Longest cache TTL accepted from the environment (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Shared key for /api/root/*; root routes are open when unset
    pub root_key: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Process-wide secret for tenant key derivation; random per process when unset
    pub master_secret: Option<String>,
    pub session_ttl_secs: u64,
    pub context_ttl_secs: u64,
    pub tenant_config_ttl_secs: u64,
    pub tenant_key_ttl_secs: u64,
    pub module_boundary_ttl_secs: u64,
}

impl SecurityConfig {
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            tenant_config_ttl: Duration::from_secs(self.tenant_config_ttl_secs),
            tenant_key_ttl: Duration::from_secs(self.tenant_key_ttl_secs),
            module_boundary_ttl: Duration::from_secs(self.module_boundary_ttl_secs),
            master_secret: self.master_secret.clone(),
            ..RegistryOptions::default()
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            session_ttl: Duration::from_secs(self.session_ttl_secs),
            context_ttl: Duration::from_secs(self.context_ttl_secs),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("SERVER_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ROOT_KEY") {
            self.security.root_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours =
                bounded("SECURITY_JWT_EXPIRY_HOURS", &v, self.security.jwt_expiry_hours, MAX_JWT_EXPIRY_HOURS);
        }
        if let Ok(v) = env::var("SECURITY_MASTER_SECRET") {
            self.security.master_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_SESSION_TTL_SECS") {
            self.security.session_ttl_secs = bounded("SECURITY_SESSION_TTL_SECS", &v, self.security.session_ttl_secs, MAX_TTL_SECS);
        }
        if let Ok(v) = env::var("SECURITY_CONTEXT_TTL_SECS") {
            self.security.context_ttl_secs = bounded("SECURITY_CONTEXT_TTL_SECS", &v, self.security.context_ttl_secs, MAX_TTL_SECS);
        }
        if let Ok(v) = env::var("SECURITY_TENANT_CONFIG_TTL_SECS") {
            self.security.tenant_config_ttl_secs = bounded("SECURITY_TENANT_CONFIG_TTL_SECS", &v, self.security.tenant_config_ttl_secs, MAX_TTL_SECS);
        }
        if let Ok(v) = env::var("SECURITY_TENANT_KEY_TTL_SECS") {
            self.security.tenant_key_ttl_secs = bounded("SECURITY_TENANT_KEY_TTL_SECS", &v, self.security.tenant_key_ttl_secs, MAX_TTL_SECS);
        }
        if let Ok(v) = env::var("SECURITY_MODULE_BOUNDARY_TTL_SECS") {
            self.security.module_boundary_ttl_secs = bounded("SECURITY_MODULE_BOUNDARY_TTL_SECS", &v, self.security.module_boundary_ttl_secs, MAX_TTL_SECS);
        }

        self
    }

    fn base_security() -> SecurityConfig {
        SecurityConfig {
            enable_cors: true,
            cors_origins: Vec::new(),
            root_key: None,
            jwt_secret: String::new(),
            jwt_expiry_hours: 24,
            master_secret: None,
            session_ttl_secs: 2 * 60 * 60,
            context_ttl_secs: 60 * 60,
            tenant_config_ttl_secs: 60 * 60,
            tenant_key_ttl_secs: 24 * 60 * 60,
            module_boundary_ttl_secs: 60 * 60,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "tenant-security-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                ..Self::base_security()
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                ..Self::base_security()
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_expiry_hours: 4,
                ..Self::base_security()
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// Parse a positive duration setting no larger than `max`; anything else keeps `current`
fn bounded(name: &str, raw: &str, current: u64, max: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(value) if (1..=max).contains(&value) => value,
        Ok(value) => {
            tracing::warn!("{}={} is outside 1..={}, keeping {}", name, value, max, current);
            current
        }
        Err(_) => {
            tracing::warn!("{}='{}' is not a number, keeping {}", name, raw, current);
            current
        }
    }
}

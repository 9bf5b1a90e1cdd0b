use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::cache::{CacheStore, MemoryCache};
use crate::config::{AppConfig, SecurityConfig};
use crate::handlers;
use crate::middleware::{root_key_middleware, security_context_middleware};
use crate::security::{DirectoryPermissionSource, SessionContextManager, TenantRegistry};

/// Shared handles passed to every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<dyn CacheStore>,
    pub registry: Arc<TenantRegistry>,
    pub sessions: Arc<SessionContextManager>,
    pub directory: Arc<DirectoryPermissionSource>,
}

impl AppState {
    /// In-process cache with a grant-table permission source
    pub fn new(config: AppConfig) -> Self {
        Self::with_cache(config, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(config: AppConfig, cache: Arc<dyn CacheStore>) -> Self {
        let registry = Arc::new(TenantRegistry::with_options(
            cache.clone(),
            config.security.registry_options(),
        ));
        let directory = Arc::new(DirectoryPermissionSource::new());
        let sessions = Arc::new(SessionContextManager::with_options(
            registry.clone(),
            cache.clone(),
            directory.clone(),
            config.security.session_options(),
        ));

        Self {
            config: Arc::new(config),
            cache,
            registry,
            sessions,
            directory,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security, state.config.is_development());

    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Elevated API
        .merge(root_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors);

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new().route("/auth/login/:tenant/:user", post(auth::session_login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, modules, security};

    Router::new()
        // Session management for authenticated users
        .route("/api/auth/whoami", get(auth::session_whoami))
        .route("/api/auth/session/refresh", put(auth::session_refresh))
        .route("/api/auth/session", axum::routing::delete(auth::session_logout))
        // Cellular modules
        .route("/api/modules", get(modules::modules_list))
        .route("/api/modules/:module", get(modules::module_get))
        // Tenant policy
        .route("/api/security/policy", get(security::policy_get))
        .route_layer(middleware::from_fn_with_state(state, security_context_middleware))
}

fn root_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::root::tenant;

    Router::new()
        .route("/api/root/tenants", get(tenant::tenant_list).post(tenant::tenant_create))
        .route("/api/root/tenants/:tenant", get(tenant::tenant_show))
        .route("/api/root/tenants/:tenant/users/:user", put(tenant::tenant_grant))
        .route_layer(middleware::from_fn_with_state(state, root_key_middleware))
}

fn cors_layer(security: &SecurityConfig, development: bool) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Tenant Security API",
            "version": version,
            "description": "Multi-tenant security contexts, cellular module boundaries and tenant policy",
            "compliance_tags": state.registry.compliance_tags(),
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login/:tenant/:user (public - session and token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/session[/refresh] (protected)",
                "modules": "/api/modules[/:module] (protected)",
                "security": "/api/security/policy (protected, admin)",
                "root": "/api/root/tenants[/:tenant[/users/:user]] (restricted, requires root key)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.cache.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "cache": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "cache unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "cache_error": e.to_string()
                }
            })),
        ),
    }
}

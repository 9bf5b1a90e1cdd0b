use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::security::RequestMetadata;
use crate::server::AppState;

/// Header carrying the shared key for elevated routes
pub const ROOT_KEY_HEADER: &str = "x-root-key";

/// Resolves the bearer token to a validated SecurityContext and injects it
/// into the request.
///
/// A context that expired ahead of its session is rebuilt from the session.
pub async fn security_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token, &state.config.security)?;

    let metadata = request_metadata(request.headers());
    let context = state.sessions.load_context(&claims.sid, metadata).await?;

    if context.tenant_id != claims.tenant || context.user_id != claims.user {
        tracing::warn!("Token claims do not match session '{}'", claims.sid);
        return Err(ApiError::unauthorized("Token does not match session"));
    }

    if !state.sessions.validate_context(&context).await {
        return Err(ApiError::unauthorized("Session expired or revoked"));
    }

    tracing::debug!(
        "Authenticated user '{}' in tenant '{}'",
        context.user_id,
        context.tenant_id
    );
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Gate for /api/root/*; open when no root key is configured
pub async fn root_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.security.root_key.as_deref() {
        let provided = request
            .headers()
            .get(ROOT_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        if provided != Some(expected) {
            tracing::warn!("Rejected root request to {}", request.uri().path());
            return Err(ApiError::forbidden("Root key required"));
        }
    }

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Client address and agent as seen through proxies
pub fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown")
        .to_string();

    RequestMetadata {
        ip_address: Some(ip_address),
        user_agent: header("user-agent").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_required() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn metadata_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));

        let metadata = request_metadata(&headers);
        assert_eq!(metadata.ip_address.as_deref(), Some("1.2.3.4"));
        assert_eq!(metadata.user_agent.as_deref(), Some("curl/8.0"));

        let metadata = request_metadata(&HeaderMap::new());
        assert_eq!(metadata.ip_address.as_deref(), Some("unknown"));
        assert_eq!(metadata.user_agent, None);
    }
}

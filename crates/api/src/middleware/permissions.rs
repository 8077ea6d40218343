use crate::error::ApiError;
use crate::middleware::AuthUser;
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, Query, RawPathParams, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use mero_authz::{RequestContext, RequestMeta, ScopeSelector};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Largest JSON body buffered to look for scope hints
const MAX_SCOPE_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Run the permission guard for the matched route.
///
/// Required permissions come from the permission table keyed by method and
/// route template. The request context built here is stored in the request
/// extensions for handlers.
pub async fn require_permissions(
    State(state): State<Arc<crate::AppState>>,
    path_params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let required = state.permissions.required_for(request.method().as_str(), &route);

    let path: HashMap<String, String> = path_params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();

    let (request, body) = if wants_body_scan(request.method(), request.headers()) {
        buffer_json_body(request).await?
    } else {
        (request, None)
    };

    let principal = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.principal);

    let ctx = RequestContext::new(principal)
        .with_scope(ScopeSelector::from_sources(&path, &query, body.as_ref()))
        .with_meta(request_meta(&request));

    state.guard.authorize(&ctx, required).await?;

    let mut request = request;
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

fn wants_body_scan(method: &Method, headers: &HeaderMap) -> bool {
    let has_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE);
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    has_body && is_json
}

async fn buffer_json_body(
    request: Request,
) -> Result<(Request, Option<serde_json::Value>), ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_SCOPE_BODY_BYTES)
        .await
        .map_err(|_| ApiError::BadRequest("Request body too large".to_string()))?;

    // Malformed JSON is left for the handler's extractor to reject
    let value = serde_json::from_slice(&bytes).ok();

    Ok((Request::from_parts(parts, Body::from(bytes)), value))
}

pub fn request_meta(request: &Request) -> RequestMeta {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());
    let ip = forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    RequestMeta {
        endpoint: request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string()),
        method: request.method().to_string(),
        ip,
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_meta_prefers_forwarded_for() {
        let mut request = Request::builder()
            .method("DELETE")
            .uri("/api/permissions/time-based/4?dry_run=true")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("user-agent", "mero-web/2.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let meta = request_meta(&request);
        assert_eq!(meta.endpoint, "/api/permissions/time-based/4?dry_run=true");
        assert_eq!(meta.method, "DELETE");
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("mero-web/2.1"));
    }

    #[test]
    fn test_request_meta_falls_back_to_peer_address() {
        let mut request = Request::builder()
            .uri("/api/audit-logs")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4000))));

        let meta = request_meta(&request);
        assert_eq!(meta.ip.as_deref(), Some("192.168.1.20"));
        assert!(meta.user_agent.is_none());
    }

    #[test]
    fn test_only_json_bodies_are_scanned() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(wants_body_scan(&Method::POST, &headers));
        assert!(!wants_body_scan(&Method::GET, &headers));

        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!wants_body_scan(&Method::POST, &headers));
    }

    #[tokio::test]
    async fn test_buffered_body_is_restored() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"appSlug":"mero-board","role_id":5}"#))
            .unwrap();

        let (request, value) = buffer_json_body(request).await.unwrap();
        assert_eq!(value.unwrap()["appSlug"], "mero-board");

        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"appSlug":"mero-board","role_id":5}"#);
    }
}

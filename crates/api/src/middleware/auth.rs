use crate::error::ApiError;
use crate::jwt::{Claims, JwtService};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use mero_authz::Principal;
use std::sync::Arc;

/// Authenticated caller, stored in request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
    pub email: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            principal: claims.principal()?,
            email: claims.email,
        })
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(ApiError::MissingToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidAuthScheme)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::InvalidAuthScheme)
}

pub fn authenticate(jwt: &JwtService, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_bearer_token(headers)?;
    let claims = jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Token validation failed");
        e
    })?;
    AuthUser::try_from(claims)
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.jwt, &headers)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::test_support::{issue_token, TEST_SECRET};
    use axum::http::HeaderValue;
    use chrono::Duration;
    use uuid::Uuid;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header() {
        let jwt = JwtService::new(TEST_SECRET);
        let err = authenticate(&jwt, &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn test_wrong_scheme() {
        assert!(matches!(
            extract_bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(ApiError::InvalidAuthScheme)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Bearer ")),
            Err(ApiError::InvalidAuthScheme)
        ));
    }

    #[test]
    fn test_valid_token_yields_principal() {
        let jwt = JwtService::new(TEST_SECRET);
        let principal = Principal {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
        };
        let token = issue_token(TEST_SECRET, &principal, Duration::minutes(15));

        let user = authenticate(&jwt, &headers(&format!("Bearer {}", token))).unwrap();
        assert_eq!(user.principal, principal);
    }
}

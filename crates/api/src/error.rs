use crate::jwt::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mero_authz::AuthzError;
use mero_database::DatabaseError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authorization header is required")]
    MissingToken,

    #[error("Authorization header must use Bearer scheme")]
    InvalidAuthScheme,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidAuthScheme | ApiError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authz(err) => match err {
                AuthzError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                AuthzError::NotAMember
                | AuthzError::RoleNotFound(_)
                | AuthzError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
                AuthzError::NotFound(_) => StatusCode::NOT_FOUND,
                AuthzError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthzError::Conflict(_) => StatusCode::CONFLICT,
                AuthzError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingToken => "missing_auth_header",
            ApiError::InvalidAuthScheme => "invalid_auth_scheme",
            ApiError::Token(TokenError::Expired) => "token_expired",
            ApiError::Token(TokenError::Invalid(_)) => "invalid_token",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Authz(err) => match err {
                AuthzError::NotAuthenticated => "not_authenticated",
                AuthzError::NotAMember => "not_a_member",
                AuthzError::RoleNotFound(_) => "role_not_found",
                AuthzError::InsufficientPermissions { .. } => "insufficient_permissions",
                AuthzError::NotFound(_) => "not_found",
                AuthzError::Validation(_) => "validation_error",
                AuthzError::Conflict(_) => "conflict",
                AuthzError::Database(_) => "internal_error",
            },
            ApiError::Database(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse::new(self.code(), &message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_outcomes_map_to_401_and_403() {
        assert_eq!(
            ApiError::from(AuthzError::NotAuthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AuthzError::NotAMember).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AuthzError::RoleNotFound(4)).status(), StatusCode::FORBIDDEN);

        let denied = ApiError::from(AuthzError::InsufficientPermissions {
            missing: vec!["boards.delete".to_string()],
        });
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(denied.code(), "insufficient_permissions");
        assert_eq!(
            denied.to_string(),
            "You do not have the required permissions: boards.delete"
        );
    }

    #[test]
    fn test_store_failures_are_500() {
        let err = ApiError::from(AuthzError::Database(DatabaseError::Other("down".into())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }

    #[test]
    fn test_token_errors_are_401() {
        assert_eq!(ApiError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(TokenError::Expired).code(), "token_expired");
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = ApiError::from(AuthzError::NotAMember).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "not_a_member");
        assert_eq!(body.message, "You are not a member of this organization");
    }
}

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mero_authz::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,             // User ID
    pub organization_id: String, // Organization the session is bound to
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn principal(&self) -> Result<Principal, TokenError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| TokenError::Invalid("Invalid user ID in token".to_string()))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|_| TokenError::Invalid("Invalid organization ID in token".to_string()))?;

        Ok(Principal {
            user_id,
            organization_id,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Verifies HS256 access tokens issued by the identity service
pub struct JwtService {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
        }
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(self.algorithm);
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::access::{Caller, Role};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone)]
pub struct IdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl IdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn resolve_header(&self, authorization: Option<&str>) -> Result<Caller, AppError> {
        let Some(raw) = authorization else {
            return Ok(Caller::Anonymous);
        };

        let token = raw
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".to_string()))?;

        self.resolve_token(token.trim())
    }

    pub fn resolve_token(&self, token: &str) -> Result<Caller, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::Unauthorized("invalid token".to_string())
        })?;

        Ok(Caller::Authenticated {
            subject: data.claims.sub,
            role: data.claims.role,
        })
    }
}

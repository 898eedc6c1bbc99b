// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Authentication for the `/api/*` surface.
//!
//! The middleware authenticates each request and deposits an
//! [`AuthPrincipal`] as a request extension; handlers and the edge lifecycle
//! trust that principal for tenant scoping. `/health` stays outside.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated principal attached to each request
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub roles: Vec<String>,
    pub email: Option<String>,
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    #[error("JWT token validation failed: {0}")]
    JwtValidation(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub roles: Vec<String>,
    pub email: Option<String>,
    /// Expiration time
    pub exp: usize,
}

/// Authenticator trait for pluggable auth strategies
pub trait Authenticator: Send + Sync {
    /// Authenticate request by examining headers (synchronous)
    fn authenticate(&self, headers: &axum::http::HeaderMap) -> Result<AuthPrincipal, AuthError>;
}

/// API Key authenticator
pub struct ApiKeyAuth {
    /// Map of API key -> (tenant_id, user_id)
    keys: std::collections::HashMap<String, (Uuid, Uuid)>,
}

impl ApiKeyAuth {
    /// Keys are configured as "api_key:tenant_uuid:user_uuid"; malformed
    /// entries are skipped with a warning rather than failing startup.
    pub fn new(api_keys: Vec<String>) -> Self {
        let mut keys = std::collections::HashMap::new();

        for key_config in api_keys {
            let parts: Vec<&str> = key_config.split(':').collect();
            if parts.len() == 3 {
                if let (Ok(tenant_id), Ok(user_id)) =
                    (Uuid::parse_str(parts[1]), Uuid::parse_str(parts[2]))
                {
                    keys.insert(parts[0].to_string(), (tenant_id, user_id));
                    continue;
                }
            }
            tracing::warn!("Skipping malformed API key entry (expected key:tenant:user)");
        }

        Self { keys }
    }
}

impl Authenticator for ApiKeyAuth {
    fn authenticate(&self, headers: &axum::http::HeaderMap) -> Result<AuthPrincipal, AuthError> {
        let api_key = headers
            .get("X-API-Key")
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let (tenant_id, user_id) = self
            .keys
            .get(api_key)
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(AuthPrincipal {
            id: *user_id,
            tenant_id: *tenant_id,
            roles: vec!["member".to_string()],
            email: None,
        })
    }
}

/// Bearer token (JWT) authenticator
pub struct BearerTokenAuth {
    jwt_secret: Vec<u8>,
}

impl BearerTokenAuth {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret: jwt_secret.into_bytes(),
        }
    }
}

impl Authenticator for BearerTokenAuth {
    fn authenticate(&self, headers: &axum::http::HeaderMap) -> Result<AuthPrincipal, AuthError> {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingCredentials)?;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(&self.jwt_secret),
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| AuthError::JwtValidation(e.to_string()))?;

        Ok(AuthPrincipal {
            id: token_data.claims.sub,
            tenant_id: token_data.claims.tenant_id,
            roles: token_data.claims.roles,
            email: token_data.claims.email,
        })
    }
}

/// Multi-strategy authenticator (tries multiple auth methods)
pub struct MultiAuth {
    strategies: Vec<Arc<dyn Authenticator>>,
}

impl MultiAuth {
    pub fn new(strategies: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { strategies }
    }
}

impl Authenticator for MultiAuth {
    fn authenticate(&self, headers: &axum::http::HeaderMap) -> Result<AuthPrincipal, AuthError> {
        for strategy in &self.strategies {
            if let Ok(principal) = strategy.authenticate(headers) {
                return Ok(principal);
            }
        }
        Err(AuthError::InvalidCredentials)
    }
}

/// No-op authenticator for development (no auth required)
pub struct NoAuth {
    tenant_id: Uuid,
    user_id: Uuid,
}

impl NoAuth {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id }
    }
}

impl Authenticator for NoAuth {
    fn authenticate(&self, _headers: &axum::http::HeaderMap) -> Result<AuthPrincipal, AuthError> {
        Ok(AuthPrincipal {
            id: self.user_id,
            tenant_id: self.tenant_id,
            roles: vec!["admin".to_string()],
            email: None,
        })
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    auth: axum::Extension<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = auth.authenticate(req.headers())?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_api_key_auth() {
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let auth = ApiKeyAuth::new(vec![
            format!("test_key:{}:{}", tenant, user),
            "malformed".to_string(),
        ]);

        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", "test_key".parse().unwrap());

        let principal = auth.authenticate(&headers).unwrap();
        assert_eq!(principal.tenant_id, tenant);
        assert_eq!(principal.id, user);
    }

    #[test]
    fn test_api_key_auth_rejects_unknown_key() {
        let auth = ApiKeyAuth::new(vec![]);
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", "nope".parse().unwrap());
        assert!(auth.authenticate(&headers).is_err());
    }

    #[test]
    fn test_no_auth() {
        let tenant = Uuid::new_v4();
        let auth = NoAuth::new(tenant, Uuid::nil());
        let principal = auth.authenticate(&HeaderMap::new()).unwrap();
        assert_eq!(principal.tenant_id, tenant);
    }

    #[test]
    fn test_bearer_round_trip() {
        let secret = "test-secret".to_string();
        let claims = Claims {
            sub: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            roles: vec!["member".to_string()],
            email: Some("pm@example.com".to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let auth = BearerTokenAuth::new(secret);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );

        let principal = auth.authenticate(&headers).unwrap();
        assert_eq!(principal.tenant_id, claims.tenant_id);
        assert_eq!(principal.email.as_deref(), Some("pm@example.com"));
    }
}

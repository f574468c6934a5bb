//! Authentication and authorization utilities
//!
//! Provides:
//! - Session token (JWT) generation and validation
//! - Authenticated user extraction with first-request provisioning
//! - Workspace role checks
//! - Invitation token generation
//!
//! Sessions are issued elsewhere; this service only verifies them.

use crate::db::models::{Member, Role};
use crate::db::{DbPool, Repository};
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID
    pub user_id: Uuid,

    /// Normalized email
    pub email: String,

    /// Display name, if known
    pub name: Option<String>,
}

impl AuthContext {
    /// Name used in notifications sent to other members
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// User email
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
    issuer: Option<String>,
    cookie_name: String,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
            issuer: None,
            cookie_name: "session_token".to_string(),
        }
    }

    /// Require tokens to carry this issuer
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Read sessions from this cookie when no bearer token is present
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    /// Generate a new session token
    pub fn generate_token(&self, user_id: Uuid, email: &str, name: Option<String>) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name,
            picture: None,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a session token.
    ///
    /// Every failure maps to the same unauthorized error.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let mut validation = Validation::default();
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::unauthorized(format!("invalid session token: {}", e)))
    }

    /// Pull the raw token from a bearer header or the session cookie
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer);

        if let Some(token) = bearer {
            return Some(token.to_string());
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookies| find_cookie(cookies, &self.cookie_name))
            .map(String::from)
    }
}

/// Extract token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn find_cookie<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

/// Generate an invitation token (32 random bytes, hex encoded)
pub fn generate_invite_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Require the member to hold one of the given roles
pub fn require_role(member: &Member, allowed: &[Role]) -> Result<()> {
    let role = member.role();
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: format!("Role {} is not allowed to perform this action", role),
        })
    }
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
    DbPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);

        let token = jwt
            .extract_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("no session token"))?;

        let claims = jwt.validate_token(&token)?;
        if claims.email.trim().is_empty() {
            return Err(AppError::unauthorized("session token has no email"));
        }

        let repo = Repository::new(DbPool::from_ref(state));
        let user = repo
            .ensure_user(
                Uuid::parse_str(&claims.sub).ok(),
                &claims.email,
                claims.name,
                claims.picture,
            )
            .await?;

        Ok(AuthContext {
            user_id: user.id,
            email: user.email,
            name: user.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_generate_invite_token() {
        let token = generate_invite_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_invite_token());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user_id = Uuid::new_v4();

        let token = manager
            .generate_token(user_id, "ada@example.com", Some("Ada".into()))
            .unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_bad_signature_is_unauthorized() {
        let issuer = JwtManager::new("secret-a", 3600);
        let verifier = JwtManager::new("secret-b", 3600);
        let token = issuer.generate_token(Uuid::new_v4(), "a@b.c", None).unwrap();

        let err = verifier.validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_token_from_cookie() {
        let manager = JwtManager::new("s", 60).with_cookie_name("session_token");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=abc123; other=1"),
        );
        assert_eq!(manager.extract_token(&headers).as_deref(), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(manager.extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_require_role() {
        let member = Member {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: "member".into(),
            joined_at: Utc::now().into(),
        };

        assert!(require_role(&member, &[Role::Owner, Role::Admin]).is_err());
        assert!(require_role(&member, &[Role::Member]).is_ok());
    }
}

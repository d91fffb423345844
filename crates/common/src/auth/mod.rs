//! Authentication and authorization utilities
//!
//! Provides:
//! - Staff password verification
//! - JWT token generation and validation
//! - Auth context extraction

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Staff username
    pub username: String,

    /// Login session the token belongs to
    pub session_id: Uuid,

    /// Token expiry
    pub expires_at: DateTime<Utc>,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (staff username)
    pub sub: String,

    /// Login session id
    pub sid: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// A freshly signed token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Build from config
    ///
    /// An unset secret is a configuration error unless `development` is true,
    /// in which case a random per-process secret is used and tokens do not
    /// survive a restart.
    pub fn from_config(config: &AuthConfig, development: bool) -> Result<Self> {
        let configured = config
            .jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let secret = match configured {
            Some(secret) => secret.to_string(),
            None if development => {
                tracing::warn!(
                    "auth.jwt_secret is not set; signing with an ephemeral development secret"
                );
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            }
            None => {
                return Err(AppError::Configuration {
                    message: "auth.jwt_secret must be set outside development".to_string(),
                })
            }
        };

        Ok(Self::new(&secret, config.jwt_expiration_secs))
    }

    /// Generate a new JWT token for `username`
    pub fn generate_token(&self, username: &str) -> Result<IssuedToken> {
        self.generate_token_at(username, Utc::now())
    }

    fn generate_token_at(&self, username: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let exp = now + Duration::seconds(self.expiration_secs);
        let session_id = Uuid::new_v4();

        let claims = JwtClaims {
            sub: username.to_string(),
            sid: session_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            }
        })?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            session_id,
            expires_at: exp,
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Hash a password for comparison with the configured digest
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(stored_hash.trim())
}

/// Login form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100, message = "아이디를 입력해주세요"))]
    pub username: String,

    #[validate(length(min = 1, max = 200, message = "비밀번호를 입력해주세요"))]
    pub password: String,
}

/// The single staff account allowed into the portal
#[derive(Debug, Clone)]
pub struct StaffAccount {
    username: String,
    password_hash: String,
}

impl StaffAccount {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            username: config.staff_username.clone(),
            password_hash: config.staff_password_hash.clone(),
        }
    }

    /// Check a login form against the account
    pub fn verify(&self, request: &LoginRequest) -> Result<()> {
        request.validate()?;
        if request.username.trim() == self.username
            && verify_password(&request.password, &self.password_hash)
        {
            Ok(())
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Extract the token from an Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer_token(auth_header).ok_or(AppError::InvalidToken)?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let claims = jwt.validate_token(token)?;
        let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AppError::InvalidToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AppError::InvalidToken)?;

        Ok(AuthContext {
            username: claims.sub,
            session_id,
            expires_at,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> StaffAccount {
        StaffAccount::from_config(&AuthConfig::default())
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("kca1234");
        assert!(verify_password("kca1234", &hash));
        assert!(verify_password("kca1234", &hash.to_uppercase()));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_default_account() {
        assert!(account().verify(&login("kca", "kca1234")).is_ok());
        assert!(matches!(
            account().verify(&login("kca", "nope")),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            account().verify(&login("", "kca1234")),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer   "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let issued = manager.generate_token("kca").unwrap();
        let claims = manager.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, "kca");
        assert_eq!(claims.sid, issued.session_id.to_string());
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test_secret", 60);
        let issued = manager
            .generate_token_at("kca", Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(matches!(
            manager.validate_token(&issued.token),
            Err(AppError::ExpiredToken)
        ));
    }

    #[test]
    fn test_secret_required_outside_development() {
        let config = AuthConfig::default();
        assert!(matches!(
            JwtManager::from_config(&config, false),
            Err(AppError::Configuration { .. })
        ));

        let blank = AuthConfig {
            jwt_secret: Some("  ".to_string()),
            ..AuthConfig::default()
        };
        assert!(JwtManager::from_config(&blank, false).is_err());

        let configured = AuthConfig {
            jwt_secret: Some("portal-secret".to_string()),
            ..AuthConfig::default()
        };
        let manager = JwtManager::from_config(&configured, false).unwrap();
        let issued = manager.generate_token("kca").unwrap();
        assert!(JwtManager::new("portal-secret", 3600)
            .validate_token(&issued.token)
            .is_ok());
    }

    #[test]
    fn test_development_secret_is_ephemeral() {
        let config = AuthConfig::default();
        let first = JwtManager::from_config(&config, true).unwrap();
        let second = JwtManager::from_config(&config, true).unwrap();

        let issued = first.generate_token("kca").unwrap();
        assert!(first.validate_token(&issued.token).is_ok());
        assert!(matches!(
            second.validate_token(&issued.token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_foreign_token_rejected() {
        let issued = JwtManager::new("one", 3600).generate_token("kca").unwrap();
        assert!(matches!(
            JwtManager::new("two", 3600).validate_token(&issued.token),
            Err(AppError::InvalidToken)
        ));
    }
}

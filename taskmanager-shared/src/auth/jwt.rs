/// JWT token generation and validation module
///
/// Access and refresh tokens are HS256-signed JWTs. They are signed with
/// two different secrets, so a refresh token can never pass as an access
/// token even before the `token_type` claim is checked.
///
/// # Token Types
///
/// - **Access Token**: short-lived, carries `{sub, email, username}`
/// - **Refresh Token**: longer-lived, carries `{sub}` only, and is persisted on
///   the user row as the single current value
///
/// Every token carries a random `jti`, so two tokens issued for the same user
/// within the same second still differ.
///
/// # Example
///
/// ```
/// use taskmanager_shared::auth::jwt::{TokenSettings, validate_access_token};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = TokenSettings {
///     access_secret: "access-secret-at-least-32-bytes-long!!".to_string(),
///     access_ttl: Duration::hours(1),
///     refresh_secret: "refresh-secret-at-least-32-bytes-long!".to_string(),
///     refresh_ttl: Duration::days(10),
/// };
///
/// let user_id = Uuid::new_v4();
/// let pair = settings.issue_pair(user_id, "a@b.com", "abc")?;
/// let claims = validate_access_token(&pair.access_token, &settings.access_secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "taskmanager";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is of the wrong type for this use
    #[error("Expected {expected} token")]
    WrongType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// `email` and `username` are only present on access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Issuer - Always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Unique token ID
    pub jti: Uuid,

    pub token_type: TokenType,
}

impl Claims {
    fn base(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: None,
            username: None,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    /// Creates access token claims
    pub fn access(user_id: Uuid, email: &str, username: &str, expires_in: Duration) -> Self {
        Self {
            email: Some(email.to_string()),
            username: Some(username.to_string()),
            ..Self::base(user_id, TokenType::Access, expires_in)
        }
    }

    /// Creates refresh token claims
    pub fn refresh(user_id: Uuid, expires_in: Duration) -> Self {
        Self::base(user_id, TokenType::Refresh, expires_in)
    }
}

/// Signs claims into an HS256 token
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies signature, expiration, not-before and issuer.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Signing material and lifetimes for both token types
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenSettings {
    /// Issues a new access/refresh token pair for a user
    ///
    /// The caller is responsible for persisting `refresh_token` on the user
    /// row; until that happens the refresh token will not be accepted.
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
    ) -> Result<TokenPair, JwtError> {
        let access = Claims::access(user_id, email, username, self.access_ttl);
        let refresh = Claims::refresh(user_id, self.refresh_ttl);

        Ok(TokenPair {
            access_token: create_token(&access, &self.access_secret)?,
            refresh_token: create_token(&refresh, &self.refresh_secret)?,
        })
    }
}

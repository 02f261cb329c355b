/// Request authentication
///
/// Resolves the caller's identity from an access token. The token is read
/// from the `accessToken` cookie first and from `Authorization: Bearer`
/// otherwise. A valid token must still name an existing user, and the
/// identity only ever holds the public projection of that user.
///
/// The API wires [`authenticate`] into an axum middleware that inserts the
/// resulting [`AuthContext`] into request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskmanager_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.user.username)
/// }
/// ```

use axum::http::{header, HeaderMap};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::cookie::{extract_cookie, ACCESS_TOKEN_COOKIE};
use super::jwt::validate_access_token;
use crate::models::user::{PublicUser, User};

/// Authenticated identity attached to a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: PublicUser,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in cookie or header
    #[error("Unauthorized request")]
    MissingCredentials,

    /// Token failed validation or names a user that no longer exists
    #[error("Invalid Access Token")]
    InvalidToken,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Extracts the access token from a request
///
/// The cookie wins over the header when both are present.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, ACCESS_TOKEN_COOKIE) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if no token is present
/// - `AuthError::InvalidToken` if the token fails validation or its user is gone
/// - `AuthError::DatabaseError` if the user lookup fails
pub async fn authenticate(
    pool: &PgPool,
    access_secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = extract_access_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_access_token(&token, access_secret).map_err(|e| {
        debug!(error = %e, "Access token rejected");
        AuthError::InvalidToken
    })?;

    let user = User::find_public_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(AuthContext { user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok123"));

        assert_eq!(extract_access_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn test_cookie_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=from-cookie"));

        assert_eq!(extract_access_token(&headers), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_missing_or_malformed_credentials() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_access_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(AuthError::MissingCredentials.to_string(), "Unauthorized request");
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid Access Token");
    }
}

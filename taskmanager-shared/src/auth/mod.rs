/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password strength rule
/// - [`jwt`]: access and refresh token issuance and validation
/// - [`token`]: single-use email-verification and password-reset tokens
/// - [`cookie`]: `Set-Cookie` construction and cookie extraction
/// - [`middleware`]: resolving the caller from an access token
/// - [`authorization`]: project membership and role checks
///
/// # Example
///
/// ```no_run
/// use taskmanager_shared::auth::password::{hash_password, verify_password};
/// use taskmanager_shared::auth::jwt::{create_token, validate_access_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Password@1")?;
/// assert!(verify_password("Password@1", &hash)?);
///
/// let claims = Claims::access(Uuid::new_v4(), "a@b.com", "abc", Duration::days(1));
/// let token = create_token(&claims, "access-secret-that-is-at-least-32-bytes")?;
/// validate_access_token(&token, "access-secret-that-is-at-least-32-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod token;

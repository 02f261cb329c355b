/// User model and database operations
///
/// A user row holds credentials and all token material: the Argon2id
/// password hash, the hashed email-verification and password-reset tokens
/// with their expiries, and the single current refresh token.
///
/// None of that may leave this module in a response. Handlers work with
/// [`PublicUser`], which is the same row minus every credential column.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     username VARCHAR(64) NOT NULL UNIQUE,
///     full_name VARCHAR(255),
///     avatar_url VARCHAR(512),
///     password_hash VARCHAR(255) NOT NULL,
///     is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     email_verification_token VARCHAR(64),
///     email_verification_expiry TIMESTAMPTZ,
///     forgot_password_token VARCHAR(64),
///     forgot_password_expiry TIMESTAMPTZ,
///     refresh_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskmanager_shared::models::user::{NewUser, User};
/// use taskmanager_shared::auth::token::generate_temporary_token;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let verification = generate_temporary_token();
/// let user = User::create(&pool, NewUser {
///     email: "a@b.com".to_string(),
///     username: "abc".to_string(),
///     full_name: None,
///     password: "Abcdefg1!".to_string(),
///     email_verification_token: Some(verification.hashed.clone()),
///     email_verification_expiry: Some(verification.expires_at),
/// }).await?;
///
/// assert!(!user.is_email_verified);
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password_async, PasswordError};
use crate::auth::token::TemporaryToken;

const USER_COLUMNS: &str = "id, email, username, full_name, avatar_url, password_hash, \
     is_email_verified, email_verification_token, email_verification_expiry, \
     forgot_password_token, forgot_password_expiry, refresh_token, created_at, updated_at";

const PUBLIC_USER_COLUMNS: &str =
    "id, email, username, full_name, avatar_url, is_email_verified, created_at, updated_at";

/// Error type for user operations that hash passwords
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Full user row, including credential material
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Always stored lowercase
    pub email: String,

    /// Always stored lowercase
    pub username: String,

    pub full_name: Option<String>,

    pub avatar_url: Option<String>,

    /// Argon2id PHC string
    pub password_hash: String,

    pub is_email_verified: bool,

    /// SHA-256 hex digest of the outstanding verification token
    pub email_verification_token: Option<String>,

    pub email_verification_expiry: Option<DateTime<Utc>>,

    /// SHA-256 hex digest of the outstanding reset token
    pub forgot_password_token: Option<String>,

    pub forgot_password_expiry: Option<DateTime<Utc>>,

    /// The single refresh token currently accepted for this user
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

// Keeps hashes and tokens out of logs
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("is_email_verified", &self.is_email_verified)
            .finish_non_exhaustive()
    }
}

/// User projection that is safe to return to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for registering a user
///
/// `password` is plaintext; it is hashed before the insert.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
    pub email_verification_token: Option<String>,
    pub email_verification_expiry: Option<DateTime<Utc>>,
}

impl User {
    /// Returns the public projection of this user
    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }

    /// Creates a new, unverified user
    ///
    /// Email and username are lowercased. The password is hashed with
    /// Argon2id before the row is written.
    ///
    /// # Errors
    ///
    /// - `UserError::Database` with a unique violation if the email or
    ///   username is taken
    /// - `UserError::Password` if hashing fails
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, UserError> {
        let password_hash = hash_password_async(data.password).await?;

        let query = format!(
            r#"
            INSERT INTO users (email, username, full_name, password_hash,
                               email_verification_token, email_verification_expiry)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email.trim().to_lowercase())
            .bind(data.username.trim().to_lowercase())
            .bind(data.full_name)
            .bind(password_hash)
            .bind(data.email_verification_token)
            .bind(data.email_verification_expiry)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by ID, returning only public fields
    ///
    /// Used by authentication so credential columns are never even loaded
    /// into the request context.
    pub async fn find_public_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        let query = format!("SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, PublicUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Checks whether either the email or the username is already taken
    pub async fn exists_by_email_or_username(
        pool: &PgPool,
        email: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users WHERE email = $1 OR username = $2
            )
            "#,
        )
        .bind(email.trim().to_lowercase())
        .bind(username.trim().to_lowercase())
        .fetch_one(pool)
        .await
    }

    /// Overwrites the stored refresh token (last-issued-wins)
    pub async fn store_refresh_token(
        pool: &PgPool,
        id: Uuid,
        refresh_token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the refresh token only if `current` is still the stored value
    ///
    /// Returns `false` when the token was already rotated out, so of two
    /// concurrent refreshes presenting the same token exactly one succeeds.
    pub async fn rotate_refresh_token(
        pool: &PgPool,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $3, updated_at = NOW()
            WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the stored refresh token (logout)
    pub async fn clear_refresh_token(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a new email-verification token, replacing any outstanding one
    pub async fn set_email_verification_token(
        pool: &PgPool,
        id: Uuid,
        token: &TemporaryToken,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token = $2,
                email_verification_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&token.hashed)
        .bind(token.expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes an email-verification token
    ///
    /// Matches on the hashed token with an unexpired expiry, marks the user
    /// verified and clears both token columns in the same statement. A
    /// second call with the same hash returns `None`.
    pub async fn verify_email(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_token = NULL,
                email_verification_expiry = NULL,
                updated_at = NOW()
            WHERE email_verification_token = $1
              AND email_verification_expiry > NOW()
            RETURNING {PUBLIC_USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, PublicUser>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Stores a new password-reset token, replacing any outstanding one
    pub async fn set_forgot_password_token(
        pool: &PgPool,
        id: Uuid,
        token: &TemporaryToken,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET forgot_password_token = $2,
                forgot_password_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&token.hashed)
        .bind(token.expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes a password-reset token and sets a new password
    ///
    /// Clears the reset token columns and the stored refresh token, which
    /// signs out any existing session. Returns `None` if the token is
    /// unknown, expired or already used.
    pub async fn reset_password(
        pool: &PgPool,
        token_hash: &str,
        new_password: String,
    ) -> Result<Option<PublicUser>, UserError> {
        let password_hash = hash_password_async(new_password).await?;

        let query = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                forgot_password_token = NULL,
                forgot_password_expiry = NULL,
                refresh_token = NULL,
                updated_at = NOW()
            WHERE forgot_password_token = $1
              AND forgot_password_expiry > NOW()
            RETURNING {PUBLIC_USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, PublicUser>(&query)
            .bind(token_hash)
            .bind(password_hash)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Sets a new password for a user
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        new_password: String,
    ) -> Result<bool, UserError> {
        let password_hash = hash_password_async(new_password).await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

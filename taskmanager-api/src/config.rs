/// Configuration management for the API server
///
/// Configuration is read from environment variables once at startup. A
/// `.env` file is loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8000`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `ACCESS_TOKEN_SECRET` / `REFRESH_TOKEN_SECRET`: JWT signing keys
///   (required, at least 32 bytes, must differ)
/// - `ACCESS_TOKEN_EXPIRY` / `REFRESH_TOKEN_EXPIRY`: token lifetimes as
///   plain seconds or `30s`, `15m`, `12h`, `10d` (default `1d` / `10d`)
/// - `CORS_ORIGIN`: comma-separated allowed origins
///   (default `http://localhost:5173`)
/// - `COOKIE_SECURE`: `Secure` cookie attribute and HSTS (default true)
/// - `APP_PUBLIC_URL`: base for links in emails (default `http://localhost:8000`)
/// - `FORGOT_PASSWORD_REDIRECT_URL`: base for password reset links
/// - `MAIL_API_URL` / `MAIL_API_TOKEN`: HTTP mail API; both must be set to
///   deliver mail, otherwise messages are only logged
/// - `MAIL_FROM`: sender address (default `no-reply@taskmanager.local`)
///
/// # Example
///
/// ```no_run
/// use taskmanager_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use anyhow::{anyhow, bail, Context};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use taskmanager_shared::auth::cookie::CookieConfig;
use taskmanager_shared::auth::jwt::TokenSettings;

const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Origins allowed to make credentialed cross-origin requests
    pub cors_origins: Vec<String>,

    /// Sets `Secure` on cookies and enables HSTS
    pub cookie_secure: bool,

    /// Public base URL of this server, used in email links
    pub public_url: String,

    /// Base URL that password reset tokens are appended to
    pub forgot_password_redirect_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
///
/// Secrets must be kept out of logs; `Debug` on this struct is only used in
/// tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_expiry_seconds: i64,
    pub refresh_secret: String,
    pub refresh_expiry_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub from: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is
    /// invalid. Startup treats this as fatal.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow!("{} environment variable is required", key))
        };

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let cors_origins = var("CORS_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]);

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).context("COOKIE_SECURE must be true or false")?,
            None => true,
        };

        let public_url = var("APP_PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        let forgot_password_redirect_url = var("FORGOT_PASSWORD_REDIRECT_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/api/v1/auth/reset-password", public_url));

        let database_url = required("DATABASE_URL")?;
        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let access_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required("REFRESH_TOKEN_SECRET")?;

        if access_secret.len() < MIN_SECRET_LENGTH {
            bail!("ACCESS_TOKEN_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if refresh_secret.len() < MIN_SECRET_LENGTH {
            bail!("REFRESH_TOKEN_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if access_secret == refresh_secret {
            bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let access_expiry_seconds =
            parse_duration_seconds(&var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|| "1d".to_string()))
                .context("ACCESS_TOKEN_EXPIRY is invalid")?;
        let refresh_expiry_seconds = parse_duration_seconds(
            &var("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|| "10d".to_string()),
        )
        .context("REFRESH_TOKEN_EXPIRY is invalid")?;

        let mail = MailConfig {
            api_url: var("MAIL_API_URL"),
            api_token: var("MAIL_API_TOKEN"),
            from: var("MAIL_FROM").unwrap_or_else(|| "no-reply@taskmanager.local".to_string()),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                cookie_secure,
                public_url,
                forgot_password_redirect_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                access_secret,
                access_expiry_seconds,
                refresh_secret,
                refresh_expiry_seconds,
            },
            mail,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Signing material and lifetimes for issuing tokens
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_secret: self.jwt.access_secret.clone(),
            access_ttl: Duration::seconds(self.jwt.access_expiry_seconds),
            refresh_secret: self.jwt.refresh_secret.clone(),
            refresh_ttl: Duration::seconds(self.jwt.refresh_expiry_seconds),
        }
    }

    /// Attributes for the auth cookies
    pub fn cookie_config(&self) -> CookieConfig {
        CookieConfig {
            secure: self.api.cookie_secure,
            ..CookieConfig::default()
        }
    }

    /// Link a user follows to verify their email
    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/api/v1/auth/verify-email/{}", self.api.public_url, token)
    }

    /// Link a user follows to reset their password
    pub fn reset_password_url(&self, token: &str) -> String {
        format!("{}/{}", self.api.forgot_password_redirect_url, token)
    }

    /// Whether outbound mail goes through the HTTP mail API
    pub fn mail_delivery_enabled(&self) -> bool {
        self.mail.api_url.is_some() && self.mail.api_token.is_some()
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}

/// Parses a lifetime such as `900`, `30s`, `15m`, `12h` or `10d` into seconds
pub fn parse_duration_seconds(raw: &str) -> anyhow::Result<i64> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.chars().last() {
        Some('s') => (&raw[..raw.len() - 1], 1),
        Some('m') => (&raw[..raw.len() - 1], 60),
        Some('h') => (&raw[..raw.len() - 1], 60 * 60),
        Some('d') => (&raw[..raw.len() - 1], 60 * 60 * 24),
        Some(c) if c.is_ascii_digit() => (raw, 1),
        _ => bail!("expected a duration like 15m or 1d, got {:?}", raw),
    };

    let value = digits
        .parse::<i64>()
        .with_context(|| format!("expected a duration like 15m or 1d, got {:?}", raw))?;

    if value <= 0 {
        bail!("duration must be positive, got {:?}", raw);
    }

    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow!("duration {:?} is too large", raw))
}

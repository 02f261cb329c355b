/// Auth cookie transport
///
/// Login and refresh set both token cookies with a `Max-Age` equal to each
/// token's lifetime. Logout clears them with `Max-Age=0`.

use axum::{
    http::{header::SET_COOKIE, HeaderName},
    response::AppendHeaders,
};
use taskmanager_shared::auth::cookie::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use taskmanager_shared::auth::jwt::TokenPair;

use crate::config::Config;

pub type CookieHeaders = AppendHeaders<[(HeaderName, String); 2]>;

/// `Set-Cookie` headers carrying a freshly issued pair
pub fn set_token_cookies(config: &Config, tokens: &TokenPair) -> CookieHeaders {
    let cookies = config.cookie_config();

    AppendHeaders([
        (
            SET_COOKIE,
            cookies.build_set_cookie(
                ACCESS_TOKEN_COOKIE,
                &tokens.access_token,
                config.jwt.access_expiry_seconds,
            ),
        ),
        (
            SET_COOKIE,
            cookies.build_set_cookie(
                REFRESH_TOKEN_COOKIE,
                &tokens.refresh_token,
                config.jwt.refresh_expiry_seconds,
            ),
        ),
    ])
}

/// `Set-Cookie` headers removing both token cookies
pub fn clear_token_cookies(config: &Config) -> CookieHeaders {
    let cookies = config.cookie_config();

    AppendHeaders([
        (SET_COOKIE, cookies.build_delete_cookie(ACCESS_TOKEN_COOKIE)),
        (SET_COOKIE, cookies.build_delete_cookie(REFRESH_TOKEN_COOKIE)),
    ])
}

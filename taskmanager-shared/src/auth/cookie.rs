//! Cookie helpers for token transport
//!
//! Tokens travel in `HttpOnly` cookies for browser clients. Clients that
//! can't hold cookies send `Authorization: Bearer` instead.

use axum::http::{header, HeaderMap};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes shared by both token cookies
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
        }
    }
}

impl CookieConfig {
    fn attributes(&self) -> String {
        let mut attrs = String::new();

        if self.http_only {
            attrs.push_str("; HttpOnly");
        }
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        attrs.push_str(&format!("; Path={}", self.path));
        attrs
    }

    /// Builds a `Set-Cookie` value
    pub fn build_set_cookie(&self, name: &str, value: &str, max_age_secs: i64) -> String {
        format!("{}={}{}; Max-Age={}", name, value, self.attributes(), max_age_secs)
    }

    /// Builds a `Set-Cookie` value that removes the cookie
    ///
    /// Attributes must match the ones used to set it or browsers keep the
    /// original.
    pub fn build_delete_cookie(&self, name: &str) -> String {
        format!("{}={}; Max-Age=0", name, self.attributes())
    }
}

/// Extracts a cookie value from request headers
///
/// Looks through every `Cookie` header. Empty values count as absent.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;

            if key == name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_build_set_cookie() {
        let config = CookieConfig::default();
        let cookie = config.build_set_cookie(ACCESS_TOKEN_COOKIE, "abc.def.ghi", 3600);

        assert!(cookie.starts_with("accessToken=abc.def.ghi"));
        assert!(cookie.contains("; HttpOnly"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("; SameSite=Lax"));
        assert!(cookie.contains("; Path=/"));
        assert!(cookie.ends_with("; Max-Age=3600"));
    }

    #[test]
    fn test_insecure_cookie_for_local_http() {
        let config = CookieConfig {
            secure: false,
            ..Default::default()
        };
        let cookie = config.build_set_cookie(REFRESH_TOKEN_COOKIE, "x", 10);

        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_build_delete_cookie() {
        let cookie = CookieConfig::default().build_delete_cookie(REFRESH_TOKEN_COOKIE);

        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.ends_with("Max-Age=0"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; accessToken=abc123; other=xyz"),
        );

        assert_eq!(
            extract_cookie(&headers, ACCESS_TOKEN_COOKIE),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie(&headers, "foo"), Some("bar".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_cookie_across_headers_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("accessToken="));
        headers.append(header::COOKIE, HeaderValue::from_static("refreshToken=r1"));

        assert_eq!(extract_cookie(&headers, ACCESS_TOKEN_COOKIE), None);
        assert_eq!(
            extract_cookie(&headers, REFRESH_TOKEN_COOKIE),
            Some("r1".to_string())
        );
    }
}

/// Middleware for the API server
///
/// - `auth`: resolves the caller and attaches an `AuthContext`
/// - `security`: security response headers

pub mod auth;
pub mod security;

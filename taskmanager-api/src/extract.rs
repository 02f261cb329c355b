/// Request extractors
///
/// [`AppJson`] replaces `axum::Json` for request bodies so malformed or
/// oversized bodies are rejected with the regular error envelope instead of
/// axum's plain-text rejection.

use axum::extract::FromRequest;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

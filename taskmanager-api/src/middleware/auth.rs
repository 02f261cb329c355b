/// Authentication layer
///
/// Applied with `axum::middleware::from_fn_with_state` to every route that
/// needs a caller. On success the resolved
/// [`AuthContext`](taskmanager_shared::auth::middleware::AuthContext) is
/// inserted into request extensions for handlers to extract.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use taskmanager_shared::auth::middleware::authenticate;

use crate::{app::AppState, error::ApiError};

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(&state.db, &state.tokens.access_secret, req.headers()).await?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

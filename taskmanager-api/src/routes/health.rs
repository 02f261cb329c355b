/// Health check endpoint
///
/// ```text
/// GET /api/v1/healthcheck
/// ```
///
/// ```json
/// {
///   "statusCode": 200,
///   "data": { "status": "healthy", "version": "0.1.0", "database": "connected" },
///   "message": "Server is running",
///   "success": true
/// }
/// ```
///
/// An unreachable database degrades the status but still answers 200 so
/// the process itself can be probed.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use taskmanager_shared::db::pool::health_check as database_health_check;
use tracing::warn;

use crate::{app::AppState, response::ApiResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let connected = match database_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };

    ApiResponse::ok(
        HealthResponse {
            status: if connected { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
        },
        "Server is running",
    )
}

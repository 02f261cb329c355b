/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmanager_api::{app::{build_router, AppState}, config::Config};
/// use taskmanager_shared::email::LogEmailSender;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(LogEmailSender));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use taskmanager_shared::auth::jwt::TokenSettings;
use taskmanager_shared::email::{EmailSender, Product};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::{
    config::Config,
    middleware::{
        auth::require_auth,
        security::{security_headers, SecurityPolicy},
    },
    routes,
};

/// Request bodies above this size are rejected with 413
pub const BODY_LIMIT_BYTES: usize = 16 * 1024;

/// Shared application state
///
/// Cloned into every handler through the `State` extractor; all fields are
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn EmailSender>,
    pub tokens: Arc<TokenSettings>,
    pub product: Arc<Product>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn EmailSender>) -> Self {
        let tokens = Arc::new(config.token_settings());

        Self {
            db,
            config: Arc::new(config),
            mailer,
            tokens,
            product: Arc::new(Product::default()),
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /api/v1
/// ├── GET  /healthcheck
/// ├── /auth
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── POST /refresh-token
/// │   ├── GET  /verify-email/:token
/// │   ├── POST /forgot-password
/// │   ├── POST /reset-password/:token
/// │   ├── POST /logout                      (auth)
/// │   ├── GET  /current-user                (auth)
/// │   ├── POST /change-password             (auth)
/// │   └── POST /resend-email-verification   (auth)
/// └── /projects                             (auth)
///     ├── GET, POST /
///     ├── GET, PUT, DELETE /:projectId
///     ├── GET, POST /:projectId/members
///     ├── PUT, DELETE /:projectId/members/:userId
///     ├── GET, POST /:projectId/tasks
///     ├── GET, PUT, DELETE /:projectId/tasks/:taskId
///     ├── POST /:projectId/tasks/:taskId/subtasks
///     └── PUT, DELETE /:projectId/tasks/:taskId/subtasks/:subtaskId
/// ```
pub fn build_router(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), require_auth);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh-token", post(routes::auth::refresh_access_token))
        .route("/verify-email", get(routes::auth::verify_email_missing_token))
        .route("/verify-email/", get(routes::auth::verify_email_missing_token))
        .route("/verify-email/:token", get(routes::auth::verify_email))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:token", post(routes::auth::reset_password));

    let protected_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/current-user", get(routes::auth::current_user))
        .route("/change-password", post(routes::auth::change_password))
        .route(
            "/resend-email-verification",
            post(routes::auth::resend_email_verification),
        )
        .route_layer(auth_layer.clone());

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/members",
            get(routes::members::list_members).post(routes::members::add_member),
        )
        .route(
            "/:project_id/members/:user_id",
            put(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .route(
            "/:project_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:project_id/tasks/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks",
            post(routes::subtasks::create_subtask),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks/:subtask_id",
            put(routes::subtasks::update_subtask).delete(routes::subtasks::delete_subtask),
        )
        .route_layer(auth_layer);

    let v1_routes = Router::new()
        .route("/healthcheck", get(routes::health::health_check))
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/projects", project_routes);

    Router::new()
        .nest("/api/v1", v1_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(from_fn_with_state(
            SecurityPolicy {
                hsts: state.config.api.cookie_secure,
            },
            security_headers,
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Credentials forbid a literal wildcard, so echo the caller's origin
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

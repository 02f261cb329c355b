/// Schema migrations
///
/// SQL files under `migrations/` at the workspace root are compiled into
/// the binary with `sqlx::migrate!` and applied on startup.

use sqlx::{migrate::MigrateDatabase, migrate::Migrator, PgPool, Postgres};
use tracing::{debug, error, info};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every migration not yet recorded in `_sqlx_migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let known = MIGRATOR.iter().count();
    debug!(migrations = known, "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Schema migration failed");
        e
    })?;

    info!(migrations = known, "Schema is up to date");
    Ok(())
}

/// Highest applied migration version, `None` on a fresh database
pub async fn schema_version(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations')::text")
            .fetch_one(pool)
            .await?;

    if tracked.is_none() {
        return Ok(None);
    }

    sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
}

/// Creates the target database when missing
///
/// Used by test setup against throwaway databases.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    info!("Creating missing database");
    Postgres::create_database(database_url).await
}

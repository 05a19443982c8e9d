/// Embedded schema migrations
///
/// SQL files live in `migrations/` at the workspace root and are compiled
/// into the binary, so the API and the worker always agree on the schema.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

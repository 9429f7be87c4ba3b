//! Database migration command.

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_database::DatabasePool;

use crate::output;

/// Run all pending migrations.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    folio_database::migration::run_migrations(pool.pool()).await?;
    pool.close().await;
    output::print_success("All migrations applied.");
    Ok(())
}

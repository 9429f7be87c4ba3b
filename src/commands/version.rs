//! Version-bump grant migration command.

use clap::Args;

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_core::types::ContentId;
use folio_service::FolioEngine;

use crate::output;

/// Arguments for the migrate-version command
#[derive(Debug, Args)]
pub struct MigrateVersionArgs {
    /// Superseded content id
    #[arg(long)]
    pub from: ContentId,
    /// Content id of the new version
    #[arg(long)]
    pub to: ContentId,
}

/// Retarget every grant on `from` to `to`.
pub async fn execute(args: &MigrateVersionArgs, config: &AppConfig) -> Result<(), AppError> {
    let engine = FolioEngine::from_config(config).await?;
    let migrated = engine.authed.migrate_version(args.from, args.to).await?;
    output::print_success("Grants migrated.");
    output::print_kv("Grants", &migrated.to_string());
    Ok(())
}

//! Item-count repair command.

use clap::Args;

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_core::types::FolderId;
use folio_service::FolioEngine;

use super::ScopeArgs;
use crate::output;

/// Arguments for the repair command
#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Tree to repair
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// Repair only these folders instead of the whole tree
    #[arg(long = "id")]
    pub ids: Vec<FolderId>,
}

/// Recompute `items_count` and `has_descendant`.
pub async fn execute(args: &RepairArgs, config: &AppConfig) -> Result<(), AppError> {
    let engine = FolioEngine::from_config(config).await?;
    let fixed = if args.ids.is_empty() {
        engine.folders.repair_tree(args.scope.scope()).await?
    } else {
        engine.folders.repair_items_count(&args.ids).await?
    };
    output::print_success("Repair finished.");
    output::print_kv("Folders fixed", &fixed.to_string());
    Ok(())
}

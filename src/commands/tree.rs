//! Folder tree display command.

use clap::Args;

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_entity::folder::FolderNode;
use folio_service::FolioEngine;

use super::ScopeArgs;
use crate::output::{self, OutputFormat};

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Tree to show
    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Print the folder tree.
pub async fn execute(args: &TreeArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let engine = FolioEngine::from_config(config).await?;
    let tree = engine.folders.folder_tree(args.scope.scope()).await?;

    match format {
        OutputFormat::Json => output::print_item(&tree, format),
        OutputFormat::Text => {
            if tree.roots.is_empty() {
                println!("No folders found.");
            }
            for node in &tree.roots {
                print_node(node, 0);
            }
            output::print_kv("Folders", &tree.total_folders.to_string());
        }
    }
    Ok(())
}

fn print_node(node: &FolderNode, depth: usize) {
    println!("{}{} ({}) [{}]", "  ".repeat(depth), node.name, node.id, node.items_count);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

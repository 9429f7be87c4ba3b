//! CLI command definitions and dispatch.

pub mod migrate;
pub mod repair;
pub mod tree;
pub mod version;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_entity::folder::{OwnerType, Partition, TreeScope};

use crate::output::OutputFormat;

/// Folio folder hierarchy, sharing and content authorization maintenance tool
#[derive(Debug, Parser)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (`config/{env}.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Recompute cached folder item counts
    Repair(repair::RepairArgs),
    /// Move content grants from an old version to its successor
    MigrateVersion(version::MigrateVersionArgs),
    /// Print the folder tree of one owner and partition
    Tree(tree::TreeArgs),
}

/// Identifies one folder tree.
#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Owner type: `organization` or `private`
    #[arg(long)]
    pub owner_type: OwnerType,
    /// Owning organization or user id
    #[arg(long)]
    pub owner: Uuid,
    /// Partition: `plans and materials` or `assets`
    #[arg(long)]
    pub partition: Partition,
}

impl ScopeArgs {
    /// The tree these arguments name.
    pub fn scope(&self) -> TreeScope {
        TreeScope {
            owner_type: self.owner_type,
            owner: self.owner,
            partition: self.partition,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(config).await,
            Commands::Repair(args) => repair::execute(args, config).await,
            Commands::MigrateVersion(args) => version::execute(args, config).await,
            Commands::Tree(args) => tree::execute(args, config, self.format).await,
        }
    }
}

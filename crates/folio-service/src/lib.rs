//! # folio-service
//!
//! The Folio engine. Each service orchestrates the store traits, the lock
//! coordinator and the organization directory to implement one group of
//! use cases:
//!
//! - [`FolderService`]: folder CRUD, content links, item-count repair
//! - [`MoveService`]: single and bulk moves with subtree path rewrites
//! - [`ShareService`]: folder shares and the grants they cause
//! - [`AuthedContentService`]: direct grants and version migration
//!
//! Services follow constructor injection; [`FolioEngine`] wires them all.

pub mod content;
pub mod context;
pub mod directory;
pub mod engine;
pub mod folder;
pub mod share;

#[cfg(test)]
pub(crate) mod testing;

pub use content::{ContentVersionResolver, LatestMap};
pub use context::Operator;
pub use directory::StaticOrganizationDirectory;
pub use engine::FolioEngine;
pub use folder::{
    AddItemsRequest, BulkMoveRequest, CreateFolderRequest, FolderService, MoveItemRequest,
    MoveService, MoveTarget, UpdateFolderRequest,
};
pub use share::{
    AuthedContentService, AuthorizationPropagator, FolderShareChange, ShareFoldersRequest,
    ShareService,
};

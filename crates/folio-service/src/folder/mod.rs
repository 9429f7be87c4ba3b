//! Folder store and move engine.

pub mod mover;
pub mod service;

pub use mover::{BulkMoveRequest, MoveItemRequest, MoveService, MoveTarget};
pub use service::{AddItemsRequest, CreateFolderRequest, FolderService, UpdateFolderRequest};

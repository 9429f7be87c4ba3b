//! Folder domain entities.

pub mod condition;
pub mod model;
pub mod path;
pub mod tree;

pub use condition::FolderCondition;
pub use model::{FolderItem, ItemType, OwnerType, Partition, TreeScope};
pub use path::{FolderPath, escape_like};
pub use tree::{FolderNode, FolderTree};

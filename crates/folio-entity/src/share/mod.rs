//! Folder sharing and content authorization entities.

pub mod model;

pub use model::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

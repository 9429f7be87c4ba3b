//! Folder sharing and content authorization.

pub mod authed;
pub mod propagation;
pub mod service;

pub use authed::AuthedContentService;
pub use propagation::AuthorizationPropagator;
pub use service::{FolderShareChange, ShareFoldersRequest, ShareService};

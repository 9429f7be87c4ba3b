//! # folio-database
//!
//! Persistence for Folio: the store traits the engine reads through, the
//! [`ChangeSet`] every operation commits atomically, the PostgreSQL
//! implementation and an in-memory implementation used by tests and
//! single-process tooling.

pub mod changes;
pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use changes::{ChangeSet, ItemCountFix, PathRewrite};
pub use connection::DatabasePool;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use repositories::PgStore;
pub use store::{ChildStats, ContentStore, FolderStore, ShareStore, Store, UnitOfWork};

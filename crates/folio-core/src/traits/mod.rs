//! Core traits defined in `folio-core` and implemented by other crates.

pub mod cache;
pub mod directory;

pub use cache::CacheProvider;
pub use directory::{OrganizationDirectory, RegionScope};

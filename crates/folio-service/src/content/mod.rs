//! Content version resolution.

pub mod version;

pub use version::{ContentVersionResolver, LatestMap};
